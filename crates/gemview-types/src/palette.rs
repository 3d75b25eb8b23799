//! Symbolic color and font identifiers.
//!
//! The document core never deals in concrete RGBA values or font files; it
//! names palette entries and font roles, and the canvas resolves them.

use serde::{Deserialize, Serialize};

/// Palette entries used by the document renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorId {
    Background,
    Paragraph,
    FirstParagraph,
    Heading1,
    Heading2,
    Heading3,
    Preformatted,
    Quote,
    QuoteIcon,
    BannerBackground,
    BannerTitle,
    BannerIcon,
    LinkText,
    LinkTextHover,
    LinkIcon,
    LinkIconVisited,
    LinkDomain,
    HypertextLinkText,
    GopherLinkText,
    BadLink,
    LinkFeedEntryDate,
    /// Selection highlight.
    Marked,
    /// Found-text highlight.
    Matching,
    UiBackground,
    UiText,
    UiTextDim,
    UiAccent,
}

/// Font roles assigned by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontId {
    Regular,
    FirstParagraph,
    Monospace,
    Heading1,
    Heading2,
    Heading3,
    Quote,
    Banner,
    UiLabel,
    Symbols,
}

impl FontId {
    /// Heading level (0-based) for heading fonts.
    pub fn heading_level(self) -> Option<usize> {
        match self {
            FontId::Heading1 => Some(0),
            FontId::Heading2 => Some(1),
            FontId::Heading3 => Some(2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels() {
        assert_eq!(FontId::Heading1.heading_level(), Some(0));
        assert_eq!(FontId::Heading3.heading_level(), Some(2));
        assert_eq!(FontId::Regular.heading_level(), None);
    }
}
