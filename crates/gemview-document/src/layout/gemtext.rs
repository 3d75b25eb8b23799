//! Reference typesetter for text/gemini and plain text.

use std::ops::Range;

use gemview_net::Url;
use gemview_types::geometry::{Int2, Rangei, Rect};
use gemview_types::palette::{ColorId, FontId};

use super::measure::{MonospaceMeasurer, TextMeasurer};
use super::{
    DocumentLayout, Format, Heading, Link, LinkFlags, LinkId, PreId, Run, RunFlags, RunKey,
    SearchDir, find_ascii_ci,
};
use crate::gemini::{GeminiDocument, GeminiLine};
use crate::media::Media;

/// Glyphs used as site icons, picked by theme seed.
const SITE_ICONS: &[char] = &[
    '\u{1f30d}', '\u{1f332}', '\u{1f3e0}', '\u{1f4da}', '\u{1f680}', '\u{1f308}', '\u{1f30a}',
    '\u{1f319}', '\u{2615}', '\u{1f4dc}', '\u{1f9ed}', '\u{1f33b}',
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "wav", "mid"];

/// Indentation of link, list and quote text, in glyphs.
const INDENT_GLYPHS: i32 = 4;

/// Typesets gemtext into runs with a pluggable [`TextMeasurer`].
pub struct GemDocument {
    measurer: Box<dyn TextMeasurer>,
    base: Option<Url>,
    format: Format,
    banner_enabled: bool,
    theme_seed: u32,
    source: String,
    width: i32,
    generation: u32,
    runs: Vec<Run>,
    links: Vec<Link>,
    headings: Vec<Heading>,
    /// Run index ranges, one per preformatted block.
    pre_blocks: Vec<Range<usize>>,
    size: Int2,
    title: Option<Range<usize>>,
    banner_title: String,
    media: Media,
}

impl Default for GemDocument {
    fn default() -> Self {
        Self::new(MonospaceMeasurer::default())
    }
}

impl GemDocument {
    pub fn new(measurer: impl TextMeasurer + 'static) -> Self {
        Self {
            measurer: Box::new(measurer),
            base: None,
            format: Format::Gemini,
            banner_enabled: true,
            theme_seed: 0,
            source: String::new(),
            width: 0,
            generation: 0,
            runs: Vec::new(),
            links: Vec::new(),
            headings: Vec::new(),
            pre_blocks: Vec::new(),
            size: Int2::ZERO,
            title: None,
            banner_title: String::new(),
            media: Media::new(),
        }
    }

    fn line_height(&self, font: FontId) -> i32 {
        self.measurer.line_height(font)
    }

    fn indent(&self) -> i32 {
        self.measurer.advance(FontId::Regular, "m") * INDENT_GLYPHS
    }

    /// Greedy word wrap of `range` into lines no wider than `avail`.
    fn wrap(&self, range: Range<usize>, font: FontId, avail: i32) -> Vec<Range<usize>> {
        let mut lines = Vec::new();
        let text = &self.source[range.clone()];
        let base = range.start;
        let mut words = Vec::new();
        let mut word_start = None;
        for (i, c) in text.char_indices() {
            match (c.is_whitespace(), word_start) {
                (false, None) => word_start = Some(i),
                (true, Some(s)) => {
                    words.push(base + s..base + i);
                    word_start = None;
                },
                _ => {},
            }
        }
        if let Some(s) = word_start {
            words.push(base + s..base + text.len());
        }

        let fits = |r: Range<usize>| self.measurer.advance(font, &self.source[r]) <= avail;
        let mut line: Option<Range<usize>> = None;
        for word in words {
            let mut start = word.start;
            if let Some(cur) = line.take() {
                if fits(cur.start..word.end) {
                    line = Some(cur.start..word.end);
                    continue;
                }
                lines.push(cur);
            }
            // Break words that do not fit on a line of their own.
            while !fits(start..word.end) {
                let mut cut = start;
                for (i, c) in self.source[start..word.end].char_indices() {
                    let next = start + i + c.len_utf8();
                    if !fits(start..next) {
                        break;
                    }
                    cut = next;
                }
                if cut == start {
                    // Not even one glyph fits.
                    cut = start + self.source[start..].chars().next().map_or(1, char::len_utf8);
                }
                lines.push(start..cut);
                start = cut;
            }
            line = Some(start..word.end);
        }
        if let Some(cur) = line {
            lines.push(cur);
        }
        lines
    }

    /// Push one run per wrapped line. Returns the total height.
    fn push_lines(
        &mut self,
        lines: &[Range<usize>],
        x: i32,
        y: i32,
        font: FontId,
        color: ColorId,
        link: Option<LinkId>,
    ) -> i32 {
        let lh = self.line_height(font);
        let mut h = 0;
        for (i, r) in lines.iter().enumerate() {
            let w = self.measurer.advance(font, &self.source[r.clone()]);
            let mut run = Run::new(r.clone(), font, color, Rect::new(x, y + h, w, lh));
            run.link_id = link;
            if i + 1 == lines.len() {
                run.flags |= RunFlags::END_OF_LINE;
            }
            self.runs.push(run);
            h += lh;
        }
        h
    }

    fn link_flags(&self, url: Option<&Url>) -> LinkFlags {
        let Some(url) = url else {
            return LinkFlags::empty();
        };
        let mut flags = match url.scheme.as_str() {
            "gemini" => LinkFlags::GEMINI_SCHEME | LinkFlags::SUPPORTED_PROTOCOL,
            "gopher" => LinkFlags::GOPHER_SCHEME | LinkFlags::SUPPORTED_PROTOCOL,
            "http" | "https" => LinkFlags::HTTP_SCHEME,
            "file" => LinkFlags::FILE_SCHEME | LinkFlags::SUPPORTED_PROTOCOL,
            "data" => LinkFlags::DATA_SCHEME | LinkFlags::SUPPORTED_PROTOCOL,
            "about" => LinkFlags::ABOUT_SCHEME | LinkFlags::SUPPORTED_PROTOCOL,
            "mailto" => LinkFlags::MAILTO_SCHEME,
            _ => LinkFlags::empty(),
        };
        if let Some(base) = &self.base {
            if !url.host.eq_ignore_ascii_case(&base.host) {
                flags |= LinkFlags::REMOTE;
            }
            if url.to_string() == base.to_string() {
                flags |= LinkFlags::SELF_LINK;
            }
        }
        if let Some(ext) = url.extension().map(str::to_ascii_lowercase) {
            if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                flags |= LinkFlags::IMAGE_FILE_EXTENSION;
            } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
                flags |= LinkFlags::AUDIO_FILE_EXTENSION;
            }
        }
        flags
    }

    fn layout_link(&mut self, url_range: Range<usize>, display: Option<Range<usize>>, y: i32) -> i32 {
        let id = self.links.len() as LinkId + 1;
        let raw = &self.source[url_range.clone()];
        let parsed = match &self.base {
            Some(base) => base.resolve(raw),
            None => Url::parse(raw),
        };
        let mut flags = self.link_flags(parsed.as_ref());
        if self.media.has_content(id) {
            flags |= LinkFlags::CONTENT;
        }
        if self.media.is_permanent(id) {
            flags |= LinkFlags::PERMANENT;
        }
        let label = display.unwrap_or_else(|| url_range.clone());
        self.links.push(Link {
            url: parsed.map_or_else(|| raw.to_string(), |u| u.to_string()),
            url_range,
            label_range: label.clone(),
            flags,
        });

        let lh = self.line_height(FontId::Regular);
        let indent = self.indent();
        let icon = if flags.contains(LinkFlags::IMAGE_FILE_EXTENSION) {
            '\u{1f5bc}'
        } else if flags.contains(LinkFlags::AUDIO_FILE_EXTENSION) {
            '\u{1f3b5}'
        } else if flags.contains(LinkFlags::REMOTE) {
            '\u{27a0}'
        } else {
            '\u{2192}'
        };
        let mut deco = Run::new(
            label.start..label.start,
            FontId::Symbols,
            ColorId::LinkIcon,
            Rect::new(0, y, indent, lh),
        );
        deco.flags = RunFlags::DECORATION;
        deco.link_id = Some(id);
        deco.icon = Some(icon);
        self.runs.push(deco);

        let color = if flags.contains(LinkFlags::SUPPORTED_PROTOCOL) {
            ColorId::LinkText
        } else if flags.contains(LinkFlags::HTTP_SCHEME) {
            ColorId::HypertextLinkText
        } else {
            ColorId::BadLink
        };
        let lines = self.wrap(label.clone(), FontId::Regular, self.width - indent);
        let lines = if lines.is_empty() { vec![label.clone()] } else { lines };
        let mut h = self.push_lines(&lines, indent, y, FontId::Regular, color, Some(id));

        if let Some(image_id) = self.media.find_image(id) {
            let size = self.media.image(image_id).map_or(Int2::ZERO, |img| img.size);
            let (mut w, mut ih) = (size.x.max(1), size.y.max(1));
            if w > self.width && self.width > 0 {
                ih = ih * self.width / w;
                w = self.width;
            }
            let mut run = Run::new(
                label.end..label.end,
                FontId::Regular,
                ColorId::Background,
                Rect::new(0, y + h, w, ih),
            );
            run.image_id = Some(image_id);
            run.link_id = Some(id);
            self.runs.push(run);
            h += ih;
        }
        if let Some(audio_id) = self.media.find_audio(id) {
            let mut run = Run::new(
                label.end..label.end,
                FontId::UiLabel,
                ColorId::UiBackground,
                Rect::new(0, y + h, self.width, 2 * lh),
            );
            run.audio_id = Some(audio_id);
            run.link_id = Some(id);
            self.runs.push(run);
            h += 2 * lh;
        }
        h
    }

    fn layout_preformatted(&mut self, lines: &[Range<usize>], y: i32) -> i32 {
        let pre_id = self.pre_blocks.len() as PreId + 1;
        let font = FontId::Monospace;
        let lh = self.line_height(font);
        let first = self.runs.len();
        let mut widest = 0;
        for (i, r) in lines.iter().enumerate() {
            let w = self.measurer.advance(font, &self.source[r.clone()]);
            widest = widest.max(w);
            let mut run = Run::new(
                r.clone(),
                font,
                ColorId::Preformatted,
                Rect::new(0, y + i as i32 * lh, w, lh),
            );
            run.pre_id = Some(pre_id);
            run.flags = RunFlags::END_OF_LINE;
            self.runs.push(run);
        }
        if widest > self.width {
            for run in &mut self.runs[first..] {
                run.flags |= RunFlags::WIDE;
            }
        }
        self.pre_blocks.push(first..self.runs.len());
        lines.len() as i32 * lh
    }

    fn layout(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.runs.clear();
        self.links.clear();
        self.headings.clear();
        self.pre_blocks.clear();
        let parsed = match self.format {
            Format::Gemini => GeminiDocument::parse(&self.source),
            Format::PlainText => GeminiDocument::parse_plain(&self.source),
        };
        self.title = match self.format {
            Format::Gemini => parsed.title(),
            Format::PlainText => None,
        };

        let lh = self.line_height(FontId::Regular);
        let indent = self.indent();
        let glyph = indent / INDENT_GLYPHS;
        let mut y = 0;
        if self.banner_enabled && !self.banner_title.is_empty() {
            let mut banner = Run::new(
                0..0,
                FontId::Banner,
                ColorId::BannerTitle,
                Rect::new(0, 0, self.width, 2 * lh),
            );
            banner.flags = RunFlags::SITE_BANNER;
            banner.icon = Some(self.site_icon());
            self.runs.push(banner);
            y += 2 * lh;
        }

        let mut first_paragraph = true;
        for line in &parsed.lines {
            match line {
                GeminiLine::Text(r) => {
                    let (font, color) = if first_paragraph {
                        (FontId::FirstParagraph, ColorId::FirstParagraph)
                    } else {
                        (FontId::Regular, ColorId::Paragraph)
                    };
                    first_paragraph = false;
                    let lines = self.wrap(r.clone(), font, self.width);
                    y += self.push_lines(&lines, 0, y, font, color, None);
                },
                GeminiLine::Link { url, display } => {
                    y += self.layout_link(url.clone(), display.clone(), y);
                },
                GeminiLine::Heading1(r) | GeminiLine::Heading2(r) | GeminiLine::Heading3(r) => {
                    let (font, color) = match line {
                        GeminiLine::Heading1(_) => (FontId::Heading1, ColorId::Heading1),
                        GeminiLine::Heading2(_) => (FontId::Heading2, ColorId::Heading2),
                        _ => (FontId::Heading3, ColorId::Heading3),
                    };
                    let lines = self.wrap(r.clone(), font, self.width);
                    let first = self.runs.len();
                    let h = self.push_lines(&lines, 0, y, font, color, None);
                    let bounds = self.runs[first..]
                        .iter()
                        .fold(Rect::new(0, y, 0, 0), |acc, run| acc.union(&run.bounds));
                    self.headings.push(Heading {
                        text: r.clone(),
                        level: font.heading_level().unwrap_or(0),
                        font,
                        bounds,
                    });
                    y += h;
                },
                GeminiLine::ListItem(r) => {
                    let mut bullet = Run::new(
                        r.start..r.start,
                        FontId::Symbols,
                        ColorId::Paragraph,
                        Rect::new(glyph, y, glyph, lh),
                    );
                    bullet.flags = RunFlags::DECORATION;
                    bullet.icon = Some('\u{2022}');
                    self.runs.push(bullet);
                    let lines = self.wrap(r.clone(), FontId::Regular, self.width - indent);
                    let h = self.push_lines(&lines, indent, y, FontId::Regular, ColorId::Paragraph, None);
                    y += h.max(lh);
                },
                GeminiLine::Quote(r) => {
                    let lines = self.wrap(r.clone(), FontId::Quote, self.width - indent);
                    let h = (lines.len() as i32 * self.line_height(FontId::Quote)).max(lh);
                    let mut border = Run::new(
                        r.start..r.start,
                        FontId::Quote,
                        ColorId::QuoteIcon,
                        Rect::new(0, y, glyph / 2, h),
                    );
                    border.flags = RunFlags::DECORATION | RunFlags::QUOTE_BORDER;
                    self.runs.push(border);
                    self.push_lines(&lines, indent, y, FontId::Quote, ColorId::Quote, None);
                    y += h;
                },
                GeminiLine::Preformatted { lines, .. } => {
                    y += self.layout_preformatted(lines, y);
                },
                GeminiLine::Empty => y += lh,
            }
        }
        self.size = Int2::new(self.width, y);
        log::debug!(
            "layout gen {}: {} runs, {} links, height {}",
            self.generation,
            self.runs.len(),
            self.links.len(),
            y
        );
    }

    fn key(&self, index: usize) -> RunKey {
        RunKey {
            generation: self.generation,
            index: index as u32,
        }
    }

    /// Source offset at horizontal position `x` within `run`.
    fn loc_in_run(&self, run: &Run, x: i32) -> usize {
        let rel = x - run.bounds.left();
        if rel <= 0 {
            return run.text.start;
        }
        let text = &self.source[run.text.clone()];
        for (i, c) in text.char_indices() {
            let upto = &text[..i + c.len_utf8()];
            if self.measurer.advance(run.font, upto) > rel {
                return run.text.start + i;
            }
        }
        run.text.end
    }
}

impl DocumentLayout for GemDocument {
    fn reset(&mut self) {
        self.source.clear();
        self.format = Format::Gemini;
        self.media.clear();
        self.title = None;
        self.layout();
    }

    fn set_url(&mut self, url: &str) {
        self.base = Url::parse(url);
        self.banner_title = self
            .base
            .as_ref()
            .map(|u| u.host.clone())
            .unwrap_or_default();
    }

    fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    fn format(&self) -> Format {
        self.format
    }

    fn set_site_banner_enabled(&mut self, enabled: bool) {
        self.banner_enabled = enabled;
    }

    fn has_site_banner(&self) -> bool {
        self.runs
            .first()
            .is_some_and(|r| r.flags.contains(RunFlags::SITE_BANNER))
    }

    fn set_theme_seed(&mut self, seed: u32) {
        self.theme_seed = seed;
    }

    fn site_icon(&self) -> char {
        SITE_ICONS[self.theme_seed as usize % SITE_ICONS.len()]
    }

    fn set_source(&mut self, source: &str, width: i32) {
        self.source = source.to_string();
        self.width = width.max(0);
        self.layout();
    }

    fn set_width(&mut self, width: i32) {
        let width = width.max(0);
        if width != self.width {
            self.width = width;
            self.layout();
        }
    }

    fn redo_layout(&mut self) {
        self.layout();
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn generation(&self) -> u32 {
        self.generation
    }

    fn size(&self) -> Int2 {
        self.size
    }

    fn runs(&self) -> &[Run] {
        &self.runs
    }

    fn run(&self, key: RunKey) -> Option<&Run> {
        if key.generation != self.generation {
            return None;
        }
        self.runs.get(key.index as usize)
    }

    fn render_range(&self, range: Rangei, visit: &mut dyn FnMut(RunKey, &Run)) {
        for (i, run) in self.runs.iter().enumerate() {
            if run.vis_bounds.top() >= range.end {
                break;
            }
            if run.vis_bounds.y_span().overlaps(&range) {
                visit(self.key(i), run);
            }
        }
    }

    fn find_run_at_loc(&self, loc: usize) -> Option<RunKey> {
        self.runs
            .iter()
            .position(|r| {
                r.is_content()
                    && !r.flags.contains(RunFlags::SITE_BANNER)
                    && (r.text.contains(&loc)
                        || (r.text.end == loc && r.flags.contains(RunFlags::END_OF_LINE)))
            })
            .map(|i| self.key(i))
    }

    fn find_loc(&self, pos: Int2) -> Option<usize> {
        let mut last_on_line = None;
        for run in &self.runs {
            if !run.is_content()
                || run.audio_id.is_some()
                || run.flags.contains(RunFlags::SITE_BANNER)
                || !run.bounds.y_span().contains(pos.y)
            {
                continue;
            }
            if pos.x < run.bounds.right() {
                return Some(self.loc_in_run(run, pos.x));
            }
            last_on_line = Some(run.text.end);
        }
        last_on_line
    }

    fn find_text(
        &self,
        needle: &str,
        from: Option<usize>,
        dir: SearchDir,
    ) -> Option<Range<usize>> {
        let start = match dir {
            SearchDir::Forward => from.unwrap_or(0),
            SearchDir::Backward => from.unwrap_or(self.source.len()),
        };
        find_ascii_ci(&self.source, needle, start, dir).map(|i| i..i + needle.len())
    }

    fn headings(&self) -> &[Heading] {
        &self.headings
    }

    fn title(&self) -> Option<&str> {
        self.title
            .as_ref()
            .map(|r| &self.source[r.clone()])
            .filter(|t| !t.is_empty())
    }

    fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get((id as usize).checked_sub(1)?)
    }

    fn link_count(&self) -> usize {
        self.links.len()
    }

    fn preformatted_runs(&self, pre: PreId) -> Vec<RunKey> {
        (pre as usize)
            .checked_sub(1)
            .and_then(|i| self.pre_blocks.get(i))
            .map(|r| r.clone().map(|i| self.key(i)).collect())
            .unwrap_or_default()
    }

    fn site_banner(&self) -> Option<&Run> {
        self.runs
            .first()
            .filter(|r| r.flags.contains(RunFlags::SITE_BANNER))
    }

    fn banner_title(&self) -> &str {
        &self.banner_title
    }

    fn media(&self) -> &Media {
        &self.media
    }

    fn media_mut(&mut self) -> &mut Media {
        &mut self.media
    }
}
