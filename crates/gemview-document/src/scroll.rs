//! Vertical scroll position and horizontal offsets of wide blocks.
//!
//! Both are [`Anim`] values: reading the position is a pure function of
//! the clock, and the widget keeps a frame ticker registered only while one
//! of them is still moving.

use std::collections::HashMap;

use gemview_ui::animation::Anim;

use crate::layout::PreId;

/// Lines scrolled by one `scroll.step` or wheel notch.
pub const SCROLL_STEP_LINES: i32 = 3;

/// Fraction of the document viewport scrolled by `scroll.page`.
pub const SCROLL_PAGE_FRACTION: f32 = 0.5;

/// Vertical scroll state of the document viewport.
#[derive(Debug, Clone)]
pub struct ScrollController {
    y: Anim,
    /// Total document height (from layout).
    pub content_height: i32,
    /// Height of the widget.
    pub viewport_height: i32,
    /// Extra room below the document: one page margin, two without a banner.
    pub overscroll: i32,
    /// When off every scroll is instant.
    smooth: bool,
}

impl ScrollController {
    pub fn new(smooth: bool) -> Self {
        Self {
            y: Anim::new(0.0),
            content_height: 0,
            viewport_height: 0,
            overscroll: 0,
            smooth,
        }
    }

    pub fn set_smooth(&mut self, smooth: bool) {
        self.smooth = smooth;
    }

    pub fn set_extent(&mut self, content_height: i32, viewport_height: i32, overscroll: i32) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        self.overscroll = overscroll;
    }

    /// Largest scroll position.
    pub fn scroll_max(&self) -> i32 {
        self.content_height - self.viewport_height + self.overscroll
    }

    /// Current scroll position.
    pub fn value(&self, now: u64) -> i32 {
        self.y.value_at(now).round() as i32
    }

    /// Where the current animation ends.
    pub fn target(&self) -> i32 {
        self.y.target().round() as i32
    }

    /// Progress of the current animation in `[0, 1]`.
    pub fn pos(&self, now: u64) -> f32 {
        self.y.pos(now)
    }

    pub fn is_finished(&self, now: u64) -> bool {
        self.y.is_finished(now)
    }

    /// Jump to `y` without clamping. Follow with [`Self::clamp`].
    pub fn init(&mut self, y: i32) {
        self.y.init(y as f32);
    }

    pub fn stop(&mut self, now: u64) {
        self.y.stop(now);
    }

    /// Scroll by `offset` from the current target over `duration_ms`.
    /// Returns whether the move is animated.
    pub fn smooth_scroll(&mut self, offset: i32, duration_ms: u32, now: u64) -> bool {
        let duration = if self.smooth { duration_ms } else { 0 };
        let max = self.scroll_max();
        let dest = if max > 0 {
            (self.target() + offset).max(0).min(max)
        } else {
            0
        };
        if duration > 0 {
            self.y.set_value_eased(dest as f32, now, duration);
        } else {
            self.y.set_value(dest as f32, now, 0);
        }
        duration > 0
    }

    /// Pull the position back inside `[0, scroll_max]`.
    pub fn clamp(&mut self, now: u64) {
        self.smooth_scroll(0, 0, now);
    }

    /// Scroll position as a fraction of the document height.
    pub fn norm_pos(&self, now: u64) -> f32 {
        if self.content_height > 0 {
            self.value(now) as f32 / self.content_height as f32
        } else {
            0.0
        }
    }
}

/// Horizontal offsets of wide preformatted blocks.
///
/// Blocks without an entry are at offset zero. One block at a time may be
/// animating towards its stored offset.
#[derive(Debug, Clone, Default)]
pub struct WideOffsets {
    offsets: HashMap<PreId, i32>,
    anim_id: Option<PreId>,
    anim: Anim,
}

impl WideOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every offset.
    pub fn reset(&mut self) {
        self.offsets.clear();
        self.anim_id = None;
        self.anim.init(0.0);
    }

    /// Stored (final) offset of `pre`.
    pub fn offset(&self, pre: PreId) -> i32 {
        self.offsets.get(&pre).copied().unwrap_or(0)
    }

    /// Offset to draw `pre` at.
    pub fn visual_offset(&self, pre: PreId, now: u64) -> i32 {
        if self.anim_id == Some(pre) {
            return self.anim.value_at(now).round() as i32;
        }
        self.offset(pre)
    }

    /// Block currently animating, if any.
    pub fn animating(&self) -> Option<PreId> {
        self.anim_id
    }

    pub fn is_animating(&self, now: u64) -> bool {
        self.anim_id.is_some() && !self.anim.is_finished(now)
    }

    /// Move `pre` by `delta`, clamped to `[0, max_offset]`. Returns whether
    /// the stored offset changed.
    pub fn scroll(&mut self, pre: PreId, delta: i32, max_offset: i32, duration_ms: u32, now: u64) -> bool {
        let old = self.offset(pre);
        let new = (old + delta).clamp(0, max_offset.max(0));
        if new == 0 {
            self.offsets.remove(&pre);
        } else {
            self.offsets.insert(pre, new);
        }
        if duration_ms > 0 {
            if self.anim_id != Some(pre) || self.anim.is_finished(now) {
                self.anim_id = Some(pre);
                self.anim.init(old as f32);
            }
            self.anim.set_value_eased(new as f32, now, duration_ms);
        } else {
            self.anim_id = None;
            self.anim.init(0.0);
        }
        old != new
    }

    /// Blocks drawn at a nonzero offset.
    pub fn nonzero(&self, now: u64) -> Vec<PreId> {
        let mut ids: Vec<PreId> = self.offsets.keys().copied().collect();
        if let Some(id) = self.anim_id {
            if self.visual_offset(id, now) != 0 && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        ids
    }
}
