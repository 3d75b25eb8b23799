//! Painting: the visible buffer, dirty-run repaints and overlays.

use gemview_types::error::Result;
use gemview_types::geometry::{Int2, Rangei, Rect};
use gemview_types::palette::{ColorId, FontId};

use super::DocumentWidget;
use super::player_ui::PlayerUi;
use crate::canvas::Canvas;
use crate::layout::{LinkFlags, Run, RunFlags, RunKey};
use crate::mark::Mark;
use crate::ordinal::ordinal_glyph;
use crate::save::size_label;

/// Side elements need at least this many line heights of room.
const MIN_SIDE_LINES: i32 = 4;

impl DocumentWidget {
    /// Paint the widget.
    pub fn draw(&mut self, canvas: &mut dyn Canvas) -> Result<()> {
        if !self.visible_on_screen || self.bounds.is_empty() {
            return Ok(());
        }
        let now = self.now();
        let scroll_y = self.scroll.value(now);
        let doc_bounds = self.document_bounds();
        let vis = Rangei::new(
            self.bounds.top() - doc_bounds.top() + scroll_y,
            self.bounds.bottom() - doc_bounds.top() + scroll_y,
        );

        if self.visbuf.alloc(canvas, self.bounds.size)? {
            log::debug!("session {}: visible buffer reallocated", self.session.0);
            self.dirty.clear();
        }
        self.visbuf.reposition(vis);
        self.render_buffers(canvas, vis, doc_bounds)?;

        canvas.set_clip_rect(self.bounds)?;
        for buf in self.visbuf.buffers {
            if let Some(tex) = buf.texture {
                let pos = Int2::new(self.bounds.left(), doc_bounds.top() - scroll_y + buf.origin);
                canvas.blit(tex, pos)?;
            }
        }
        self.draw_marks(canvas, vis)?;
        self.draw_players(canvas, now)?;
        self.draw_margins(canvas, doc_bounds, scroll_y)?;
        canvas.reset_clip_rect()?;

        self.draw_side_elements(canvas, doc_bounds, now)?;
        self.draw_outline(canvas, doc_bounds, now)?;
        if let Some(thumb) = self.scrollbar_thumb {
            canvas.fill_rect(thumb, ColorId::UiTextDim)?;
        }
        self.needs_redraw = false;
        Ok(())
    }

    /// Render the rows of `vis` not yet in the buffers, then repaint dirty
    /// runs in place.
    fn render_buffers(&mut self, canvas: &mut dyn Canvas, vis: Rangei, doc_bounds: Rect) -> Result<()> {
        let tex_size = self.visbuf.tex_size();
        let dx = doc_bounds.left() - self.bounds.left();
        let invalid = self.visbuf.invalid_ranges(vis);
        for (buf, range) in self.visbuf.buffers.iter().zip(invalid) {
            let Some(tex) = buf.texture else {
                continue;
            };
            let has_dirty = self
                .dirty
                .iter()
                .filter_map(|k| self.doc.run(k))
                .any(|r| r.vis_bounds.y_span().overlaps(&buf.valid));
            if range.is_empty() && !has_dirty {
                continue;
            }
            canvas.begin_target(tex)?;
            if !range.is_empty() {
                let fill = if buf.valid.is_empty() {
                    Rect::new(0, 0, tex_size.x, tex_size.y)
                } else {
                    Rect::new(0, range.start - buf.origin, tex_size.x, range.size())
                };
                canvas.fill_rect(fill, ColorId::Background)?;
                let mut keys = Vec::new();
                self.doc.render_range(range, &mut |k, _| keys.push(k));
                for key in keys {
                    self.draw_run(canvas, key, Int2::new(dx, -buf.origin))?;
                }
            }
            if has_dirty {
                let dirty: Vec<RunKey> = self.dirty.iter().collect();
                for key in dirty {
                    let Some(run) = self.doc.run(key) else {
                        continue;
                    };
                    if !run.vis_bounds.y_span().overlaps(&buf.valid) {
                        continue;
                    }
                    let band = if run.flags.contains(RunFlags::WIDE) {
                        Rect::new(0, run.vis_bounds.top() - buf.origin, tex_size.x, run.vis_bounds.height())
                    } else {
                        run.vis_bounds.moved(Int2::new(dx, -buf.origin))
                    };
                    canvas.set_clip_rect(band)?;
                    canvas.fill_rect(band, ColorId::Background)?;
                    self.draw_run(canvas, key, Int2::new(dx, -buf.origin))?;
                    canvas.reset_clip_rect()?;
                }
            }
            canvas.end_target()?;
        }
        self.visbuf.validate(vis);
        self.dirty.clear();
        Ok(())
    }

    /// Draw one run translated by `offset`.
    fn draw_run(&self, canvas: &mut dyn Canvas, key: RunKey, offset: Int2) -> Result<()> {
        let Some(run) = self.doc.run(key) else {
            return Ok(());
        };
        let now = self.now();
        let mut rect = run.bounds.moved(offset);
        if let Some(pre) = run.pre_id.filter(|_| run.flags.contains(RunFlags::WIDE)) {
            rect.pos.x -= self.wide.visual_offset(pre, now);
        }

        if run.flags.contains(RunFlags::SITE_BANNER) {
            return self.draw_banner(canvas, run, rect);
        }
        if let Some(id) = run.image_id {
            canvas.fill_rect(rect, ColorId::Background)?;
            if let Some(img) = self.doc.media().image(id) {
                canvas.draw_image(id, &img.data, rect)?;
            }
            return Ok(());
        }
        if run.audio_id.is_some() {
            // Drawn on top as a player.
            return Ok(());
        }
        if run.flags.contains(RunFlags::QUOTE_BORDER) {
            return canvas.draw_vline(rect.pos, rect.height(), ColorId::QuoteIcon);
        }

        let hovered = run.link_id.is_some() && run.link_id == self.hover_link;
        let link_flags = run
            .link_id
            .and_then(|id| self.doc.link(id))
            .map_or(LinkFlags::empty(), |l| l.flags);

        if run.is_decoration() {
            let keyed = self.link_keys.zip(run.link_id).and_then(|(keys, id)| {
                let ord = self.visible.link_ordinal(&*self.doc, id, self.ordinal_skip())?;
                ordinal_glyph(keys.mode, ord, self.config.reserve_platform_keys)
            });
            if let Some(glyph) = keyed.or(run.icon) {
                let color = if keyed.is_some() || hovered {
                    ColorId::LinkTextHover
                } else {
                    run.color
                };
                canvas.draw_text(glyph.encode_utf8(&mut [0; 4]), rect.pos, FontId::Symbols, color)?;
            }
            return Ok(());
        }

        let text = self.doc.source().get(run.text.clone()).unwrap_or("");
        let color = if run.link_id.is_some()
            && (hovered || link_flags.contains(LinkFlags::CONTENT))
        {
            ColorId::LinkTextHover
        } else {
            run.color
        };
        canvas.draw_text(text, rect.pos, run.font, color)?;

        if let Some(id) = run.link_id.filter(|_| run.flags.contains(RunFlags::END_OF_LINE)) {
            let info = match self.media_progress(id) {
                Some(bytes) => Some(format!(
                    " \u{2014} Fetching\u{2026} ({:.1} MB)",
                    bytes as f64 / 1.0e6
                )),
                None => self
                    .doc
                    .media()
                    .data(id)
                    .filter(|_| link_flags.contains(LinkFlags::CONTENT))
                    .map(|(mime, data)| format!(" \u{2014} {mime} ({})", size_label(data.len()))),
            };
            if let Some(info) = info {
                let x = rect.left() + self.measurer.advance(run.font, text);
                canvas.draw_text(&info, Int2::new(x, rect.top()), FontId::UiLabel, ColorId::LinkDomain)?;
            }
        }
        Ok(())
    }

    fn draw_banner(&self, canvas: &mut dyn Canvas, run: &Run, rect: Rect) -> Result<()> {
        canvas.fill_rect(rect, ColorId::BannerBackground)?;
        let lh = self.line_height();
        let pos = Int2::new(rect.left(), rect.top() + (rect.height() - lh) / 2);
        if let Some(icon) = run.icon {
            canvas.draw_text(icon.encode_utf8(&mut [0; 4]), pos, FontId::Banner, ColorId::BannerIcon)?;
        }
        let title: &str = if self.title_user.is_empty() {
            self.doc.banner_title()
        } else {
            &self.title_user
        };
        let x = pos.x + 2 * self.measurer.advance(FontId::Banner, "M");
        canvas.draw_text(title, Int2::new(x, pos.y), FontId::Banner, ColorId::BannerTitle)
    }

    /// Highlight the found text and the selection.
    fn draw_marks(&self, canvas: &mut dyn Canvas, vis: Rangei) -> Result<()> {
        let marks = [
            (self.found_mark, ColorId::Matching),
            (self.select_mark, ColorId::Marked),
        ];
        if marks.iter().all(|(m, _)| m.is_none_or(|m| m.is_empty())) {
            return Ok(());
        }
        let mut keys = Vec::new();
        self.doc.render_range(vis, &mut |k, run| {
            if run.is_content() && !run.flags.contains(RunFlags::SITE_BANNER) {
                keys.push(k);
            }
        });
        let now = self.now();
        canvas.set_opacity(0.5)?;
        for (mark, color) in marks {
            let Some(mark) = mark.filter(|m| !m.is_empty()) else {
                continue;
            };
            for &key in &keys {
                if let Some(rect) = self.mark_rect(key, mark, now) {
                    canvas.fill_rect(rect, color)?;
                }
            }
        }
        canvas.set_opacity(1.0)
    }

    /// Window-space rectangle of the part of run `key` covered by `mark`.
    fn mark_rect(&self, key: RunKey, mark: Mark, now: u64) -> Option<Rect> {
        let run = self.doc.run(key)?;
        let overlap = mark.overlap(&run.text)?;
        let source = self.doc.source();
        let before = source.get(run.text.start..overlap.start)?;
        let inside = source.get(overlap)?;
        let mut x = run.bounds.left() + self.measurer.advance(run.font, before);
        if let Some(pre) = run.pre_id.filter(|_| run.flags.contains(RunFlags::WIDE)) {
            x -= self.wide.visual_offset(pre, now);
        }
        let w = self.measurer.advance(run.font, inside);
        Some(self.view_rect(Rect::new(x, run.bounds.top(), w, run.bounds.height())))
    }

    fn draw_players(&self, canvas: &mut dyn Canvas, now: u64) -> Result<()> {
        for &key in &self.visible.players {
            let Some(run) = self.doc.run(key) else {
                continue;
            };
            let Some(player) = run.audio_id.and_then(|id| self.doc.media().player(id)) else {
                continue;
            };
            PlayerUi::new(self.view_rect(run.bounds), self.config.gap).draw(canvas, player, now)?;
        }
        Ok(())
    }

    /// Cover the overscroll areas above and below the document.
    fn draw_margins(&self, canvas: &mut dyn Canvas, doc_bounds: Rect, scroll_y: i32) -> Result<()> {
        let b = self.bounds;
        let doc_top = doc_bounds.top() - scroll_y;
        if doc_top > b.top() {
            let color = if self.doc.has_site_banner() {
                ColorId::BannerBackground
            } else {
                ColorId::Background
            };
            canvas.fill_rect(Rect::new(b.left(), b.top(), b.width(), doc_top - b.top()), color)?;
        }
        let doc_bottom = doc_top + self.doc.size().y;
        if doc_bottom < b.bottom() {
            let top = doc_bottom.max(b.top());
            canvas.fill_rect(Rect::new(b.left(), top, b.width(), b.bottom() - top), ColorId::Background)?;
        }
        Ok(())
    }

    /// Site icon and current heading in the left margin, once the banner
    /// has scrolled away.
    fn draw_side_elements(&self, canvas: &mut dyn Canvas, doc_bounds: Rect, now: u64) -> Result<()> {
        let opacity = self.side_opacity.value_at(now);
        let lh = self.line_height();
        let avail = doc_bounds.left() - self.bounds.left();
        if opacity <= 0.0 || avail < MIN_SIDE_LINES * lh || !self.doc.has_site_banner() {
            return Ok(());
        }
        canvas.set_opacity(opacity)?;
        let x = self.bounds.left() + self.config.gap * 2;
        let y = self.bounds.top() + lh;
        let icon = self.doc.site_icon();
        canvas.draw_text(icon.encode_utf8(&mut [0; 4]), Int2::new(x, y), FontId::Banner, ColorId::BannerIcon)?;
        if let Some(heading) = self.current_heading() {
            let max_chars = ((avail - 2 * self.config.gap * 2) / self.measurer.advance(FontId::UiLabel, "M").max(1)).max(0);
            let text: String = heading.chars().take(max_chars as usize).collect();
            canvas.draw_text(&text, Int2::new(x, y + 2 * lh), FontId::UiLabel, ColorId::UiTextDim)?;
        }
        canvas.set_opacity(1.0)
    }

    fn draw_outline(&self, canvas: &mut dyn Canvas, doc_bounds: Rect, now: u64) -> Result<()> {
        let opacity = self.outline_opacity.value_at(now);
        if opacity <= 0.0 || self.outline.is_empty() {
            return Ok(());
        }
        let left = doc_bounds.right() + self.config.gap;
        let right = self.bounds.right() - self.config.scrollbar_width;
        if right <= left {
            return Ok(());
        }
        let panel = Rect::new(left, self.bounds.top(), right - left, self.bounds.height());
        canvas.set_opacity(opacity)?;
        canvas.set_clip_rect(panel)?;
        canvas.fill_rect(panel, ColorId::UiBackground)?;
        let lh = self.measurer.line_height(FontId::UiLabel);
        let mut y = panel.top() + self.config.gap;
        let source = self.doc.source();
        for item in &self.outline {
            let text = source.get(item.text.clone()).unwrap_or("");
            let color = if self.current_heading.as_ref() == Some(&item.text) {
                ColorId::UiAccent
            } else {
                ColorId::UiText
            };
            canvas.draw_text(text, Int2::new(panel.left() + item.indent, y), FontId::UiLabel, color)?;
            y += lh;
        }
        canvas.reset_clip_rect()?;
        canvas.set_opacity(1.0)
    }
}
