//! Scrolling, wide-block offsets, find-in-page, resizing and link-key
//! mode.

use gemview_types::geometry::Int2;

use super::{Animation, DocumentWidget, LinkKeys};
use crate::layout::SearchDir;
use crate::mark::Mark;
use crate::ordinal::OrdinalMode;
use crate::scroll::{SCROLL_PAGE_FRACTION, SCROLL_STEP_LINES};

impl DocumentWidget {
    // -------------------------------------------------------------------
    // Vertical scrolling
    // -------------------------------------------------------------------

    /// Scroll by `offset` pixels over `duration_ms`.
    pub(super) fn smooth_scroll(&mut self, offset: i32, duration_ms: u32) {
        let now = self.now();
        let animated = self.scroll.smooth_scroll(offset, duration_ms, now);
        self.scroll_began(offset, animated);
    }

    fn scroll_began(&mut self, offset: i32, animated: bool) {
        if offset != 0 && self.link_keys.take().is_some() {
            self.invalidate_visible_links();
        }
        self.update_visible();
        self.needs_redraw = true;
        if animated {
            self.no_hover_while_scrolling = true;
            self.ticker.add(Animation::Scroll);
        }
    }

    /// Jump so that document-space `y` is at the middle of the view, or one
    /// line from the top.
    pub(super) fn scroll_to(&mut self, y: i32, centered: bool) {
        let mut y = y;
        if !self.doc.has_site_banner() {
            y += self.margin();
        }
        y -= if centered {
            self.document_bounds().height() / 2
        } else {
            self.line_height()
        };
        let now = self.now();
        self.update_scroll_extent();
        self.scroll.init(y);
        self.scroll.clamp(now);
        self.scroll_began(0, false);
    }

    pub(super) fn clamp_scroll(&mut self) {
        let now = self.now();
        self.scroll.clamp(now);
    }

    /// Scroll by `dir` half-pages. Paging forward may load the next image
    /// instead when that preference is on.
    pub fn scroll_page(&mut self, dir: i32, repeat: bool) {
        if self.try_image_instead_of_scrolling(dir, repeat) {
            return;
        }
        let page = self.document_bounds().height() as f32 * SCROLL_PAGE_FRACTION;
        let duration = self.config.smooth_duration_ms;
        self.smooth_scroll((dir as f32 * page) as i32, duration);
    }

    /// Scroll by `dir` steps of three lines.
    pub fn scroll_step(&mut self, dir: i32, repeat: bool) {
        if self.try_image_instead_of_scrolling(dir, repeat) {
            return;
        }
        let step = SCROLL_STEP_LINES * self.line_height();
        let duration = self.config.smooth_duration_ms;
        self.smooth_scroll(dir * step, duration);
    }

    fn try_image_instead_of_scrolling(&mut self, dir: i32, repeat: bool) -> bool {
        dir > 0
            && !repeat
            && self.config.load_image_instead_of_scrolling
            && self.fetch_next_unfetched_image()
    }

    pub fn scroll_top(&mut self) {
        self.scroll.init(0);
        self.jumped();
    }

    pub fn scroll_bottom(&mut self) {
        self.update_scroll_extent();
        self.scroll.init(self.scroll.scroll_max());
        self.jumped();
    }

    fn jumped(&mut self) {
        self.visbuf.invalidate();
        self.clamp_scroll();
        self.scroll_began(0, false);
    }

    /// One frame of an animated scroll.
    pub(super) fn refresh_while_scrolling(&mut self, now: u64) {
        let scroll_done = self.scroll.is_finished(now);
        if scroll_done && self.no_hover_while_scrolling {
            self.no_hover_while_scrolling = false;
        }
        self.update_visible();
        if !self.wide_anim_runs.is_empty() {
            let keys = self.wide_anim_runs.clone();
            self.mark_dirty(keys);
        }
        let wide_moving = self.wide.is_animating(now);
        if !wide_moving {
            self.wide_anim_runs.clear();
        }
        if !scroll_done || wide_moving {
            self.ticker.add(Animation::Scroll);
        }
        self.needs_redraw = true;
    }

    // -------------------------------------------------------------------
    // Wide blocks
    // -------------------------------------------------------------------

    /// Scroll the wide preformatted block under `mouse` sideways. Returns
    /// false when there is no wide block there.
    pub(super) fn scroll_wide_block(&mut self, mouse: Int2, delta: i32, duration_ms: u32) -> bool {
        let pos = self.document_pos(mouse);
        let Some(pre) = self
            .visible
            .wide_at(&*self.doc, pos.y)
            .and_then(|k| self.doc.run(k))
            .and_then(|r| r.pre_id)
        else {
            return false;
        };
        let runs = self.doc.preformatted_runs(pre);
        let widest = runs
            .iter()
            .filter_map(|&k| self.doc.run(k))
            .map(|r| r.vis_bounds.width())
            .max()
            .unwrap_or(0);
        let max = widest - self.document_width() + self.margin();
        let now = self.now();
        if self.wide.scroll(pre, delta, max, duration_ms, now) {
            self.mark_dirty(runs.iter().copied());
            self.select_mark = None;
            self.found_mark = None;
            if duration_ms > 0 {
                self.wide_anim_runs = runs;
                self.ticker.add(Animation::Scroll);
            }
        }
        true
    }

    /// Put every wide block back at offset zero.
    pub(super) fn reset_wide_runs(&mut self) {
        let now = self.now();
        for pre in self.wide.nonzero(now) {
            let keys = self.doc.preformatted_runs(pre);
            self.mark_dirty(keys);
        }
        self.wide.reset();
        self.wide_anim_runs.clear();
    }

    // -------------------------------------------------------------------
    // Find
    // -------------------------------------------------------------------

    /// Find the next match of `text` after the previous one, wrapping
    /// around once.
    pub fn find_next(&mut self, text: &str) -> bool {
        self.find(text, SearchDir::Forward)
    }

    pub fn find_prev(&mut self, text: &str) -> bool {
        self.find(text, SearchDir::Backward)
    }

    pub fn clear_found_mark(&mut self) {
        if self.found_mark.take().is_some() {
            self.invalidate();
        }
    }

    fn find(&mut self, text: &str, dir: SearchDir) -> bool {
        if text.is_empty() {
            self.clear_found_mark();
            return false;
        }
        let wrap = self.found_mark.is_some();
        let from = self.found_mark.map(|m| match dir {
            SearchDir::Forward => m.range().end,
            SearchDir::Backward => m.range().start,
        });
        let mut found = self.doc.find_text(text, from, dir);
        if found.is_none() && wrap {
            found = self.doc.find_text(text, None, dir);
        }
        let Some(range) = found else {
            log::debug!("session {}: '{text}' not found", self.session.0);
            self.clear_found_mark();
            return false;
        };
        self.found_mark = Some(Mark::new(range.start, range.end));
        self.reset_wide_runs();
        if let Some(y) = self
            .doc
            .find_run_at_loc(range.start)
            .and_then(|k| self.doc.run(k))
            .map(|r| r.vis_bounds.mid().y)
        {
            self.scroll_to(y, true);
        }
        self.invalidate();
        true
    }

    // -------------------------------------------------------------------
    // Resizing
    // -------------------------------------------------------------------

    /// Relayout for a new width, keeping the middle run in view.
    pub(super) fn update_width_retaining_position(&mut self) {
        let anchor = self
            .visible
            .middle_run(&*self.doc)
            .and_then(|k| self.doc.run(k))
            .map(|r| r.text.start);
        let width = self.document_width();
        self.doc.set_width(width);
        self.runs_invalidated();
        self.update_scroll_extent();
        match anchor
            .and_then(|loc| self.doc.find_run_at_loc(loc))
            .and_then(|k| self.doc.run(k))
            .map(|r| r.vis_bounds.mid().y)
        {
            Some(y) => self.scroll_to(y, true),
            None => {
                self.clamp_scroll();
                self.update_visible();
            },
        }
        self.update_outline();
        self.invalidate();
    }

    // -------------------------------------------------------------------
    // Link keys
    // -------------------------------------------------------------------

    pub(super) fn enter_link_keys(&mut self, mode: OrdinalMode, release: bool) {
        self.link_keys = Some(LinkKeys { mode, release });
        self.invalidate_visible_links();
    }

    pub(super) fn exit_link_keys(&mut self) {
        if self.link_keys.take().is_some() {
            self.invalidate_visible_links();
        }
    }
}
