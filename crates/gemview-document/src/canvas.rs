//! Drawing surface the widget paints on.
//!
//! A host provides a [`Canvas`] over its renderer: off-screen targets for the
//! visible buffer, plus a handful of primitives. Colors and fonts are palette
//! ids; mapping them to pixels is the host's business.

use gemview_types::error::Result;
use gemview_types::geometry::{Int2, Rect};
use gemview_types::palette::{ColorId, FontId};

use crate::media::MediaId;

/// Opaque handle to an off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

pub trait Canvas {
    /// Allocate a render target of `size` pixels.
    fn create_target(&mut self, size: Int2) -> Result<TextureId>;

    fn destroy_texture(&mut self, tex: TextureId) -> Result<()>;

    /// Direct drawing into `tex` until [`Canvas::end_target`].
    fn begin_target(&mut self, tex: TextureId) -> Result<()>;

    /// Go back to drawing on the screen.
    fn end_target(&mut self) -> Result<()>;

    fn fill_rect(&mut self, rect: Rect, color: ColorId) -> Result<()>;

    /// Draw `text` with its top-left corner at `pos`.
    fn draw_text(&mut self, text: &str, pos: Int2, font: FontId, color: ColorId) -> Result<()>;

    /// Draw inline image `image` scaled into `rect`.
    fn draw_image(&mut self, image: MediaId, data: &[u8], rect: Rect) -> Result<()>;

    /// Copy a render target to the screen at `pos`.
    fn blit(&mut self, tex: TextureId, pos: Int2) -> Result<()>;

    fn set_clip_rect(&mut self, rect: Rect) -> Result<()>;

    fn reset_clip_rect(&mut self) -> Result<()>;

    /// Opacity applied to subsequent drawing, in `[0, 1]`.
    fn set_opacity(&mut self, _opacity: f32) -> Result<()> {
        Ok(())
    }

    fn draw_vline(&mut self, pos: Int2, height: i32, color: ColorId) -> Result<()> {
        self.fill_rect(Rect::new(pos.x, pos.y, 1, height), color)
    }

    fn draw_hline(&mut self, pos: Int2, width: i32, color: ColorId) -> Result<()> {
        self.fill_rect(Rect::new(pos.x, pos.y, width, 1), color)
    }
}
