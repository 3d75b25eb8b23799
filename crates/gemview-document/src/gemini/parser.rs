//! Parser for text/gemini documents.
//!
//! Produces a sequence of [`GeminiLine`]s whose text is given as byte
//! ranges into the parsed source, so that layout runs, selections and
//! search results can all point back into the same string.

use std::ops::Range;

/// A parsed line from a text/gemini document.
#[derive(Debug, Clone, PartialEq)]
pub enum GeminiLine {
    /// Regular text paragraph.
    Text(Range<usize>),
    /// Link: `=> URL optional display text`
    Link {
        url: Range<usize>,
        display: Option<Range<usize>>,
    },
    /// Heading level 1: `# text`
    Heading1(Range<usize>),
    /// Heading level 2: `## text`
    Heading2(Range<usize>),
    /// Heading level 3: `### text`
    Heading3(Range<usize>),
    /// Unordered list item: `* text`
    ListItem(Range<usize>),
    /// Blockquote: `> text`
    Quote(Range<usize>),
    /// Preformatted text (between ``` markers).
    Preformatted {
        alt_text: Range<usize>,
        lines: Vec<Range<usize>>,
    },
    /// Empty line.
    Empty,
}

/// A parsed Gemini document.
#[derive(Debug, Clone, Default)]
pub struct GeminiDocument {
    /// The parsed lines that make up the document.
    pub lines: Vec<GeminiLine>,
}

impl GeminiDocument {
    /// Parse a text/gemini document.
    pub fn parse(input: &str) -> Self {
        let mut lines = Vec::new();
        let mut pre: Option<(Range<usize>, Vec<Range<usize>>)> = None;

        for (start, line) in source_lines(input) {
            let end = start + line.len();
            if let Some(rest) = line.strip_prefix("```") {
                match pre.take() {
                    Some((alt_text, pre_lines)) => lines.push(GeminiLine::Preformatted {
                        alt_text,
                        lines: pre_lines,
                    }),
                    None => pre = Some((trimmed(input, end - rest.len()..end), Vec::new())),
                }
                continue;
            }
            if let Some((_, pre_lines)) = pre.as_mut() {
                pre_lines.push(start..end);
                continue;
            }

            if line.starts_with("=>") {
                lines.push(parse_link_line(input, start + 2..end));
            } else if line.starts_with("###") {
                lines.push(GeminiLine::Heading3(trimmed(input, start + 3..end)));
            } else if line.starts_with("##") {
                lines.push(GeminiLine::Heading2(trimmed(input, start + 2..end)));
            } else if line.starts_with('#') {
                lines.push(GeminiLine::Heading1(trimmed(input, start + 1..end)));
            } else if line.starts_with("* ") {
                lines.push(GeminiLine::ListItem(trimmed(input, start + 2..end)));
            } else if line.starts_with('>') {
                lines.push(GeminiLine::Quote(trimmed(input, start + 1..end)));
            } else if line.trim().is_empty() {
                lines.push(GeminiLine::Empty);
            } else {
                lines.push(GeminiLine::Text(start..end));
            }
        }

        // Unclosed preformatted block.
        if let Some((alt_text, pre_lines)) = pre {
            if !pre_lines.is_empty() {
                lines.push(GeminiLine::Preformatted {
                    alt_text,
                    lines: pre_lines,
                });
            }
        }

        GeminiDocument { lines }
    }

    /// Parse plain text: the whole input is one preformatted block.
    pub fn parse_plain(input: &str) -> Self {
        let lines: Vec<Range<usize>> = source_lines(input)
            .map(|(start, line)| start..start + line.len())
            .collect();
        if lines.is_empty() {
            return GeminiDocument::default();
        }
        GeminiDocument {
            lines: vec![GeminiLine::Preformatted {
                alt_text: 0..0,
                lines,
            }],
        }
    }

    /// Range of the first heading's text, if any.
    pub fn title(&self) -> Option<Range<usize>> {
        self.lines.iter().find_map(|line| match line {
            GeminiLine::Heading1(t) | GeminiLine::Heading2(t) | GeminiLine::Heading3(t) => {
                Some(t.clone())
            },
            _ => None,
        })
    }
}

/// Lines of `input` with their starting byte offsets, without line
/// terminators (`\n` or `\r\n`).
fn source_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    input.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        (start, line)
    })
}

/// Shrink `range` to exclude surrounding whitespace.
fn trimmed(src: &str, range: Range<usize>) -> Range<usize> {
    let text = &src[range.clone()];
    let lead = text.len() - text.trim_start().len();
    let trail = text.len() - text.trim_end().len();
    if lead == text.len() {
        return range.end..range.end;
    }
    range.start + lead..range.end - trail
}

/// Parse a link line: `=> URL [display text]`. `range` starts after `=>`.
fn parse_link_line(src: &str, range: Range<usize>) -> GeminiLine {
    let rest = trimmed(src, range);
    let text = &src[rest.clone()];
    match text.find(char::is_whitespace) {
        Some(pos) => {
            let display = trimmed(src, rest.start + pos..rest.end);
            GeminiLine::Link {
                url: rest.start..rest.start + pos,
                display: if display.is_empty() { None } else { Some(display) },
            }
        },
        None => GeminiLine::Link {
            url: rest,
            display: None,
        },
    }
}
