//! Text measurement.

use gemview_types::palette::FontId;

/// Measures text for the typesetter.
pub trait TextMeasurer {
    /// Horizontal advance of `text` in pixels.
    fn advance(&self, font: FontId, text: &str) -> i32;
    fn line_height(&self, font: FontId) -> i32;
}

/// Fixed-width glyphs, scaled up for headings.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub glyph_width: i32,
    pub line_height: i32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            glyph_width: 8,
            line_height: 16,
        }
    }
}

impl MonospaceMeasurer {
    /// Scale factor in quarters.
    fn scale(font: FontId) -> i32 {
        match font {
            FontId::Heading1 => 8,
            FontId::Heading2 => 6,
            FontId::Heading3 => 5,
            _ => 4,
        }
    }

    pub fn glyph_width_for(&self, font: FontId) -> i32 {
        self.glyph_width * Self::scale(font) / 4
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn advance(&self, font: FontId, text: &str) -> i32 {
        text.chars().count() as i32 * self.glyph_width_for(font)
    }

    fn line_height(&self, font: FontId) -> i32 {
        self.line_height * Self::scale(font) / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_are_larger() {
        let m = MonospaceMeasurer::default();
        assert_eq!(m.advance(FontId::Regular, "abcd"), 32);
        assert_eq!(m.advance(FontId::Heading1, "abcd"), 64);
        assert_eq!(m.line_height(FontId::Heading2), 24);
        assert_eq!(m.advance(FontId::Regular, "åäö"), 24);
    }
}
