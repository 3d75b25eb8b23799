//! Document layout: the typesetter contract the widget renders from.
//!
//! A layout turns source text into positioned [`Run`]s. Runs live in a
//! per-generation arena; every relayout bumps the generation so that keys
//! held across a relayout ([`RunKey`]) can be recognized as stale.

pub mod gemtext;
pub mod measure;

use std::ops::Range;

use bitflags::bitflags;
use gemview_types::geometry::{Int2, Rangei, Rect};
use gemview_types::palette::{ColorId, FontId};

use crate::media::{Media, MediaId};

pub use gemtext::GemDocument;
pub use measure::{MonospaceMeasurer, TextMeasurer};

/// Link index within one document. Numbering starts from 1.
pub type LinkId = u32;

/// Preformatted block index within one document. Numbering starts from 1.
pub type PreId = u32;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RunFlags: u8 {
        /// Icon, bullet or border rather than source text.
        const DECORATION = 1 << 0;
        /// Part of a preformatted block wider than the document.
        const WIDE = 1 << 1;
        /// Last run of its source line.
        const END_OF_LINE = 1 << 2;
        const SITE_BANNER = 1 << 3;
        const QUOTE_BORDER = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LinkFlags: u16 {
        const GEMINI_SCHEME = 1 << 0;
        const GOPHER_SCHEME = 1 << 1;
        const HTTP_SCHEME = 1 << 2;
        const FILE_SCHEME = 1 << 3;
        const DATA_SCHEME = 1 << 4;
        const ABOUT_SCHEME = 1 << 5;
        const MAILTO_SCHEME = 1 << 6;
        /// The viewer can open the link itself.
        const SUPPORTED_PROTOCOL = 1 << 7;
        /// Points to a different host than the document.
        const REMOTE = 1 << 8;
        const IMAGE_FILE_EXTENSION = 1 << 9;
        const AUDIO_FILE_EXTENSION = 1 << 10;
        /// Inline content of the link is being shown.
        const CONTENT = 1 << 11;
        /// Inline content that cannot be hidden.
        const PERMANENT = 1 << 12;
        /// Link is the source document itself.
        const SELF_LINK = 1 << 13;
    }
}

impl LinkFlags {
    pub fn is_media(self) -> bool {
        self.intersects(LinkFlags::IMAGE_FILE_EXTENSION | LinkFlags::AUDIO_FILE_EXTENSION)
    }
}

/// Stable identity of a run: layout generation plus arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey {
    pub generation: u32,
    pub index: u32,
}

/// A positioned span of content.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Byte range into the layout's source.
    pub text: Range<usize>,
    pub font: FontId,
    pub color: ColorId,
    pub bounds: Rect,
    /// Area actually painted. Decorations may extend past `bounds`.
    pub vis_bounds: Rect,
    pub link_id: Option<LinkId>,
    pub image_id: Option<MediaId>,
    pub audio_id: Option<MediaId>,
    pub pre_id: Option<PreId>,
    pub flags: RunFlags,
    /// Glyph drawn instead of source text (decorations, banner icon).
    pub icon: Option<char>,
}

impl Run {
    pub fn new(text: Range<usize>, font: FontId, color: ColorId, bounds: Rect) -> Self {
        Self {
            text,
            font,
            color,
            bounds,
            vis_bounds: bounds,
            link_id: None,
            image_id: None,
            audio_id: None,
            pre_id: None,
            flags: RunFlags::empty(),
            icon: None,
        }
    }

    pub fn is_decoration(&self) -> bool {
        self.flags.contains(RunFlags::DECORATION)
    }

    /// Runs that carry readable content: not decorations, not media.
    pub fn is_content(&self) -> bool {
        !self.is_decoration() && self.image_id.is_none()
    }
}

/// A link in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Absolute URL after resolving against the document URL.
    pub url: String,
    /// Where the URL appears in the source.
    pub url_range: Range<usize>,
    /// Label text shown for the link.
    pub label_range: Range<usize>,
    pub flags: LinkFlags,
}

/// A heading, as listed in the outline.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub text: Range<usize>,
    /// 0 for `#`, 1 for `##`, 2 for `###`.
    pub level: usize,
    pub font: FontId,
    pub bounds: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Gemini,
    PlainText,
}

/// Direction of a text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDir {
    Forward,
    Backward,
}

/// A typeset document.
pub trait DocumentLayout {
    /// Drop all content, keeping the URL.
    fn reset(&mut self);
    fn set_url(&mut self, url: &str);
    fn set_format(&mut self, format: Format);
    fn format(&self) -> Format;
    fn set_site_banner_enabled(&mut self, enabled: bool);
    /// Whether the current layout starts with a site banner.
    fn has_site_banner(&self) -> bool;
    /// Seed for banner colors and the site icon.
    fn set_theme_seed(&mut self, seed: u32);
    fn site_icon(&self) -> char;

    fn set_source(&mut self, source: &str, width: i32);
    fn set_width(&mut self, width: i32);
    /// Typeset again, e.g. after media changed size.
    fn redo_layout(&mut self);

    fn source(&self) -> &str;
    fn generation(&self) -> u32;
    fn size(&self) -> Int2;
    fn runs(&self) -> &[Run];
    fn run(&self, key: RunKey) -> Option<&Run>;
    /// Visit runs whose visible bounds overlap the vertical `range`, in
    /// layout order.
    fn render_range(&self, range: Rangei, visit: &mut dyn FnMut(RunKey, &Run));
    /// The run containing source offset `loc`.
    fn find_run_at_loc(&self, loc: usize) -> Option<RunKey>;
    /// Source offset under a document-space position.
    fn find_loc(&self, pos: Int2) -> Option<usize>;
    fn find_text(&self, needle: &str, from: Option<usize>, dir: SearchDir)
    -> Option<Range<usize>>;

    fn headings(&self) -> &[Heading];
    fn title(&self) -> Option<&str>;
    fn link(&self, id: LinkId) -> Option<&Link>;
    fn link_count(&self) -> usize;
    /// Keys of the runs in a preformatted block.
    fn preformatted_runs(&self, pre: PreId) -> Vec<RunKey>;
    fn site_banner(&self) -> Option<&Run>;
    fn banner_title(&self) -> &str;

    fn media(&self) -> &Media;
    fn media_mut(&mut self) -> &mut Media;
}

/// Substring search that ignores ASCII case.
pub(crate) fn find_ascii_ci(hay: &str, needle: &str, from: usize, dir: SearchDir) -> Option<usize> {
    let h = hay.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || n.len() > h.len() {
        return None;
    }
    let matches_at = |i: usize| h[i..i + n.len()].eq_ignore_ascii_case(n);
    let last = h.len() - n.len();
    match dir {
        SearchDir::Forward => (from.min(last + 1)..=last)
            .filter(|&i| hay.is_char_boundary(i))
            .find(|&i| matches_at(i)),
        SearchDir::Backward => {
            let end = from.checked_sub(n.len())?;
            (0..=last.min(end))
                .rev()
                .filter(|&i| hay.is_char_boundary(i))
                .find(|&i| matches_at(i))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_search_forward() {
        assert_eq!(find_ascii_ci("Hello hello", "HELLO", 0, SearchDir::Forward), Some(0));
        assert_eq!(find_ascii_ci("Hello hello", "hello", 1, SearchDir::Forward), Some(6));
        assert_eq!(find_ascii_ci("Hello", "xyz", 0, SearchDir::Forward), None);
    }

    #[test]
    fn ascii_search_backward_ends_before_start() {
        // Matches must end at or before `from`.
        assert_eq!(find_ascii_ci("abc abc", "abc", 7, SearchDir::Backward), Some(4));
        assert_eq!(find_ascii_ci("abc abc", "abc", 4, SearchDir::Backward), Some(0));
        assert_eq!(find_ascii_ci("abc abc", "abc", 2, SearchDir::Backward), None);
    }

    #[test]
    fn media_link_flags() {
        assert!(LinkFlags::IMAGE_FILE_EXTENSION.is_media());
        assert!(!LinkFlags::GEMINI_SCHEME.is_media());
    }
}
