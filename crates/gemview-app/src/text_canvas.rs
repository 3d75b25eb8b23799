//! A canvas that keeps only text, for printing pages to a terminal.

use std::collections::HashMap;

use gemview_document::canvas::{Canvas, TextureId};
use gemview_document::media::MediaId;
use gemview_types::error::{GemviewError, Result};
use gemview_types::geometry::{Int2, Rect};
use gemview_types::palette::{ColorId, FontId};

#[derive(Debug, Clone)]
struct Glyphs {
    pos: Int2,
    text: String,
}

/// Records text draws per render target. Blits copy a target's text onto
/// the screen; fills erase whatever text they cover.
pub struct TextCanvas {
    size: Int2,
    targets: HashMap<TextureId, Vec<Glyphs>>,
    screen: Vec<Glyphs>,
    current: Option<TextureId>,
    next_id: u64,
}

impl TextCanvas {
    pub fn new(size: Int2) -> Self {
        Self {
            size,
            targets: HashMap::new(),
            screen: Vec::new(),
            current: None,
            next_id: 1,
        }
    }

    fn layer(&mut self) -> Result<&mut Vec<Glyphs>> {
        match self.current {
            None => Ok(&mut self.screen),
            Some(tex) => self
                .targets
                .get_mut(&tex)
                .ok_or_else(|| GemviewError::Render(format!("no render target {}", tex.0))),
        }
    }

    /// The screen as lines of text, top to bottom. Glyphs on the same pixel
    /// row are joined left to right.
    pub fn take_lines(&mut self) -> Vec<String> {
        let bounds = Rect::new(0, 0, self.size.x, self.size.y);
        let mut glyphs: Vec<_> = self
            .screen
            .drain(..)
            .filter(|g| bounds.contains(g.pos))
            .collect();
        glyphs.sort_by_key(|g| (g.pos.y, g.pos.x));
        let mut lines: Vec<(i32, String)> = Vec::new();
        for g in glyphs {
            match lines.last_mut() {
                Some((y, line)) if *y == g.pos.y => {
                    line.push(' ');
                    line.push_str(&g.text);
                },
                _ => lines.push((g.pos.y, g.text)),
            }
        }
        lines.into_iter().map(|(_, line)| line).collect()
    }
}

impl Canvas for TextCanvas {
    fn create_target(&mut self, _size: Int2) -> Result<TextureId> {
        let tex = TextureId(self.next_id);
        self.next_id += 1;
        self.targets.insert(tex, Vec::new());
        Ok(tex)
    }

    fn destroy_texture(&mut self, tex: TextureId) -> Result<()> {
        self.targets.remove(&tex);
        Ok(())
    }

    fn begin_target(&mut self, tex: TextureId) -> Result<()> {
        if !self.targets.contains_key(&tex) {
            return Err(GemviewError::Render(format!("no render target {}", tex.0)));
        }
        self.current = Some(tex);
        Ok(())
    }

    fn end_target(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, _color: ColorId) -> Result<()> {
        self.layer()?.retain(|g| !rect.contains(g.pos));
        Ok(())
    }

    fn draw_text(&mut self, text: &str, pos: Int2, _font: FontId, _color: ColorId) -> Result<()> {
        if !text.trim().is_empty() {
            self.layer()?.push(Glyphs {
                pos,
                text: text.to_string(),
            });
        }
        Ok(())
    }

    fn draw_image(&mut self, image: MediaId, data: &[u8], rect: Rect) -> Result<()> {
        let text = format!("[image {image}: {} bytes]", data.len());
        self.draw_text(&text, Int2::new(rect.left(), rect.top()), FontId::UiLabel, ColorId::UiText)
    }

    fn blit(&mut self, tex: TextureId, pos: Int2) -> Result<()> {
        let Some(glyphs) = self.targets.get(&tex) else {
            return Err(GemviewError::Render(format!("no render target {}", tex.0)));
        };
        let moved: Vec<_> = glyphs
            .iter()
            .map(|g| Glyphs {
                pos: Int2::new(g.pos.x + pos.x, g.pos.y + pos.y),
                text: g.text.clone(),
            })
            .collect();
        self.screen.extend(moved);
        Ok(())
    }

    fn set_clip_rect(&mut self, _rect: Rect) -> Result<()> {
        Ok(())
    }

    fn reset_clip_rect(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blitted_text_lands_on_screen_in_order() {
        let mut canvas = TextCanvas::new(Int2::new(200, 100));
        let tex = canvas.create_target(Int2::new(200, 300)).unwrap();
        canvas.begin_target(tex).unwrap();
        canvas
            .draw_text("second", Int2::new(0, 40), FontId::Regular, ColorId::Paragraph)
            .unwrap();
        canvas
            .draw_text("first", Int2::new(0, 20), FontId::Regular, ColorId::Paragraph)
            .unwrap();
        canvas
            .draw_text("hidden", Int2::new(0, 250), FontId::Regular, ColorId::Paragraph)
            .unwrap();
        canvas.end_target().unwrap();
        canvas.blit(tex, Int2::new(0, -10)).unwrap();
        assert_eq!(canvas.take_lines(), ["first", "second"]);
    }

    #[test]
    fn fill_erases_covered_text() {
        let mut canvas = TextCanvas::new(Int2::new(200, 100));
        canvas
            .draw_text("gone", Int2::new(5, 5), FontId::Regular, ColorId::Paragraph)
            .unwrap();
        canvas
            .draw_text("kept", Int2::new(5, 50), FontId::Regular, ColorId::Paragraph)
            .unwrap();
        canvas.fill_rect(Rect::new(0, 0, 200, 20), ColorId::Background).unwrap();
        assert_eq!(canvas.take_lines(), ["kept"]);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let mut canvas = TextCanvas::new(Int2::new(10, 10));
        assert!(canvas.begin_target(TextureId(99)).is_err());
    }
}
