//! Off-screen render cache for the document viewport.
//!
//! Three viewport-tall targets tile the document around the visible range.
//! Each remembers which part of its span already holds valid pixels, so a
//! scroll only renders the newly exposed rows. Runs whose look changed
//! (hover, wide-block offset, media) are queued in [`DirtyRuns`] and redrawn
//! in place.

use std::collections::BTreeSet;

use gemview_types::error::Result;
use gemview_types::geometry::{Int2, Rangei};

use crate::canvas::{Canvas, TextureId};
use crate::layout::RunKey;

pub const NUM_BUFFERS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisBufTexture {
    pub texture: Option<TextureId>,
    /// Document-space y of the top row.
    pub origin: i32,
    /// Document rows already rendered. Empty when nothing is.
    pub valid: Rangei,
}

impl VisBufTexture {
    pub fn span(&self, height: i32) -> Rangei {
        Rangei::new(self.origin, self.origin + height)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisBuf {
    pub buffers: [VisBufTexture; NUM_BUFFERS],
    tex_size: Int2,
}

fn floor_div(a: i32, b: i32) -> i32 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q }
}

impl VisBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tex_size(&self) -> Int2 {
        self.tex_size
    }

    pub fn is_allocated(&self) -> bool {
        self.buffers.iter().all(|b| b.texture.is_some())
    }

    /// Make sure every buffer is a target of `size`. Returns true when
    /// targets were (re)created, in which case nothing is valid.
    pub fn alloc(&mut self, canvas: &mut dyn Canvas, size: Int2) -> Result<bool> {
        let size = Int2::new(size.x.max(1), size.y.max(1));
        if self.tex_size == size && self.is_allocated() {
            return Ok(false);
        }
        self.dealloc(canvas)?;
        self.tex_size = size;
        for (i, buf) in self.buffers.iter_mut().enumerate() {
            buf.texture = Some(canvas.create_target(size)?);
            buf.origin = i as i32 * size.y;
            buf.valid = Rangei::default();
        }
        log::debug!("visible buffer allocated: {}x{} x{NUM_BUFFERS}", size.x, size.y);
        Ok(true)
    }

    /// Release the targets, e.g. while the widget is hidden.
    pub fn dealloc(&mut self, canvas: &mut dyn Canvas) -> Result<()> {
        for buf in &mut self.buffers {
            if let Some(tex) = buf.texture.take() {
                canvas.destroy_texture(tex)?;
            }
            buf.valid = Rangei::default();
        }
        Ok(())
    }

    pub fn invalidate(&mut self) {
        for buf in &mut self.buffers {
            buf.valid = Rangei::default();
        }
    }

    /// Move the buffers so they cover `vis` with a buffer to spare above.
    /// Buffers already at a wanted origin keep their pixels. Returns true
    /// if any buffer moved.
    pub fn reposition(&mut self, vis: Rangei) -> bool {
        let h = self.tex_size.y;
        if h <= 0 {
            return false;
        }
        let base = floor_div(vis.start, h) * h;
        let wanted = [base - h, base, base + h];
        let mut free: Vec<usize> = Vec::new();
        let mut missing: Vec<i32> = wanted.to_vec();
        for (i, buf) in self.buffers.iter().enumerate() {
            if let Some(pos) = missing.iter().position(|&o| o == buf.origin) {
                missing.remove(pos);
            } else {
                free.push(i);
            }
        }
        let moved = !free.is_empty();
        for (i, origin) in free.into_iter().zip(missing) {
            let buf = &mut self.buffers[i];
            buf.origin = origin;
            buf.valid = Rangei::default();
        }
        self.buffers.sort_by_key(|b| b.origin);
        moved
    }

    /// Per buffer, the rows within `full` that still need rendering.
    pub fn invalid_ranges(&self, full: Rangei) -> [Rangei; NUM_BUFFERS] {
        let mut out = [Rangei::default(); NUM_BUFFERS];
        for (i, buf) in self.buffers.iter().enumerate() {
            let region = buf.span(self.tex_size.y).intersect(&full);
            if region.is_empty() {
                continue;
            }
            out[i] = if buf.valid.is_empty() {
                region
            } else if buf.valid.start > region.start {
                Rangei::new(region.start, buf.valid.start)
            } else if buf.valid.end < region.end {
                Rangei::new(buf.valid.end, region.end)
            } else {
                Rangei::default()
            };
        }
        out
    }

    /// Mark each buffer valid over its part of `full`.
    pub fn validate(&mut self, full: Rangei) {
        let h = self.tex_size.y;
        for buf in &mut self.buffers {
            let region = buf.span(h).intersect(&full);
            buf.valid = buf.valid.union(&region);
        }
    }
}

/// Runs to redraw in place on the next paint.
///
/// Keys from an older layout generation are dropped when a newer one is
/// inserted, so a relayout never leaves dangling entries.
#[derive(Debug, Clone, Default)]
pub struct DirtyRuns {
    generation: u32,
    keys: BTreeSet<RunKey>,
}

impl DirtyRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RunKey) {
        self.sync(key.generation);
        self.keys.insert(key);
    }

    pub fn extend(&mut self, keys: impl IntoIterator<Item = RunKey>) {
        for key in keys {
            self.insert(key);
        }
    }

    /// Forget everything not from `generation`.
    pub fn sync(&mut self, generation: u32) {
        if generation != self.generation {
            self.keys.clear();
            self.generation = generation;
        }
    }

    pub fn contains(&self, key: RunKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = RunKey> + '_ {
        self.keys.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DrawCall, MockCanvas};

    fn allocated(h: i32) -> (VisBuf, MockCanvas) {
        let mut canvas = MockCanvas::new();
        let mut vb = VisBuf::new();
        assert!(vb.alloc(&mut canvas, Int2::new(100, h)).unwrap());
        (vb, canvas)
    }

    #[test]
    fn alloc_once_per_size() {
        let (mut vb, mut canvas) = allocated(50);
        assert_eq!(canvas.live_textures(), 3);
        assert!(!vb.alloc(&mut canvas, Int2::new(100, 50)).unwrap());
        assert!(vb.alloc(&mut canvas, Int2::new(120, 50)).unwrap());
        assert_eq!(canvas.live_textures(), 3);
        vb.dealloc(&mut canvas).unwrap();
        assert_eq!(canvas.live_textures(), 0);
        assert!(!vb.is_allocated());
    }

    #[test]
    fn fresh_buffers_are_fully_invalid() {
        let (mut vb, _) = allocated(50);
        vb.reposition(Rangei::new(0, 50));
        let full = Rangei::new(-50, 300);
        let inv = vb.invalid_ranges(full);
        assert_eq!(inv, [Rangei::new(-50, 0), Rangei::new(0, 50), Rangei::new(50, 100)]);
        vb.validate(full);
        assert!(vb.invalid_ranges(full).iter().all(Rangei::is_empty));
    }

    #[test]
    fn scrolling_keeps_overlapping_buffers() {
        let (mut vb, _) = allocated(50);
        let full = Rangei::new(0, 1000);
        vb.reposition(Rangei::new(0, 50));
        vb.validate(full);
        // Within the same tile nothing moves.
        assert!(!vb.reposition(Rangei::new(20, 70)));
        assert!(vb.reposition(Rangei::new(60, 110)));
        let origins: Vec<i32> = vb.buffers.iter().map(|b| b.origin).collect();
        assert_eq!(origins, vec![0, 50, 100]);
        let inv = vb.invalid_ranges(full);
        assert!(inv[0].is_empty());
        assert!(inv[1].is_empty());
        assert_eq!(inv[2], Rangei::new(100, 150));
    }

    #[test]
    fn growing_document_invalidates_tail() {
        let (mut vb, _) = allocated(50);
        vb.reposition(Rangei::new(0, 50));
        vb.validate(Rangei::new(0, 30));
        let inv = vb.invalid_ranges(Rangei::new(0, 80));
        assert_eq!(inv[1], Rangei::new(30, 50));
        assert_eq!(inv[2], Rangei::new(50, 80));
    }

    #[test]
    fn negative_scroll_positions() {
        let (mut vb, _) = allocated(50);
        vb.reposition(Rangei::new(-20, 30));
        let origins: Vec<i32> = vb.buffers.iter().map(|b| b.origin).collect();
        assert_eq!(origins, vec![-100, -50, 0]);
    }

    #[test]
    fn dealloc_destroys_each_texture() {
        let (mut vb, mut canvas) = allocated(10);
        vb.dealloc(&mut canvas).unwrap();
        let destroyed = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::DestroyTexture { .. }))
            .count();
        assert_eq!(destroyed, 3);
    }

    #[test]
    fn dirty_runs_drop_stale_generation() {
        let mut d = DirtyRuns::new();
        d.insert(RunKey { generation: 1, index: 4 });
        d.insert(RunKey { generation: 1, index: 2 });
        assert_eq!(d.len(), 2);
        d.insert(RunKey { generation: 2, index: 0 });
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![RunKey { generation: 2, index: 0 }]);
        d.sync(3);
        assert!(d.is_empty());
    }
}
