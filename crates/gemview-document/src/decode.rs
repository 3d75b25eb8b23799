//! Turning a success response body into document source.
//!
//! Text is transcoded to UTF-8 when another charset is declared. Images and
//! audio get a one-line document linking to themselves, with the body
//! registered as the link's inline media. An image appears only once the
//! body is complete; audio appears on the first update so playback can
//! start early and is refreshed in place afterwards.

use encoding_rs::Encoding;
use gemview_net::url::percent_decode;

use crate::layout::{Format, LinkId};
use crate::media::MediaFlags;

/// Link that carries the media of a media-only document.
pub const SELF_MEDIA_LINK: LinkId = 1;

/// Parameters parsed from a MIME meta string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MimeParams {
    /// The whole meta, lowercased.
    pub full: String,
    /// The recognized content type, if any.
    pub content_type: Option<String>,
    pub format: Option<Format>,
    pub charset: Option<String>,
}

/// Split `meta` on `;` and pick out the parts the viewer understands.
pub fn parse_mime(meta: &str) -> MimeParams {
    let full = meta.to_ascii_lowercase();
    let mut params = MimeParams {
        full: full.clone(),
        ..MimeParams::default()
    };
    for param in full.split(';').map(str::trim) {
        if param == "text/plain" {
            params.format = Some(Format::PlainText);
            params.content_type = Some(param.to_string());
        } else if param == "text/gemini" {
            params.format = Some(Format::Gemini);
            params.content_type = Some(param.to_string());
        } else if param.starts_with("image/") || param.starts_with("audio/") {
            params.format = Some(Format::Gemini);
            params.content_type = Some(param.to_string());
        } else if let Some(cs) = param.strip_prefix("charset=") {
            let cs = cs.trim();
            let cs = cs
                .strip_prefix('"')
                .and_then(|c| c.strip_suffix('"'))
                .unwrap_or(cs);
            params.charset = Some(cs.to_string());
        }
    }
    params
}

/// Result of decoding one response update.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// No recognized content type: show the unsupported type page.
    Unsupported,
    /// Replace the document source.
    Source {
        format: Format,
        source: String,
        mime: String,
        /// Register the body as media of [`SELF_MEDIA_LINK`] with these flags.
        media: Option<MediaFlags>,
    },
    /// Update the audio of [`SELF_MEDIA_LINK`] without touching the source.
    AudioRefresh { mime: String, flags: MediaFlags },
}

/// Decode a success response body.
///
/// `is_final` is set once the whole body has arrived; `is_initial` for the
/// first update of the response.
pub fn decode(meta: &str, body: &[u8], url: &str, is_final: bool, is_initial: bool) -> Decoded {
    let params = parse_mime(meta);
    let (Some(format), Some(content_type)) = (params.format, params.content_type.clone()) else {
        log::debug!("unsupported content type: {meta}");
        return Decoded::Unsupported;
    };
    let flags = if is_final {
        MediaFlags::empty()
    } else {
        MediaFlags::PARTIAL_DATA
    };
    let is_audio = content_type.starts_with("audio/");
    let is_image = content_type.starts_with("image/");
    if is_audio || is_image {
        if (is_audio && is_initial) || (is_image && is_final) {
            let fallback = if params.full.starts_with("image/") { "Image" } else { "Audio" };
            let title = media_title(url).unwrap_or_else(|| fallback.to_string());
            return Decoded::Source {
                format,
                source: format!("=> {url} {title}\n"),
                mime: content_type,
                media: Some(flags),
            };
        }
        if is_audio {
            return Decoded::AudioRefresh {
                mime: content_type,
                flags,
            };
        }
        // Incomplete image: nothing to show yet.
        return Decoded::Source {
            format,
            source: String::new(),
            mime: content_type,
            media: None,
        };
    }
    let source = transcode(body, params.charset.as_deref());
    Decoded::Source {
        format,
        source,
        mime: content_type,
        media: None,
    }
}

/// Base name of the URL path.
fn media_title(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, r)| r);
    let path = rest.find('/').map(|i| &rest[i..])?;
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let base = path.rsplit('/').next().unwrap_or("");
    if base.is_empty() {
        None
    } else {
        Some(percent_decode(base))
    }
}

/// Convert `body` to UTF-8 from `charset` (UTF-8 when absent). Unknown
/// labels fall back to lossy UTF-8.
pub fn transcode(body: &[u8], charset: Option<&str>) -> String {
    let label = charset.unwrap_or("utf-8");
    if label.eq_ignore_ascii_case("utf-8") {
        return String::from_utf8_lossy(body).into_owned();
    }
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            let (text, _, had_errors) = encoding.decode(body);
            if had_errors {
                log::debug!("malformed {label} sequences replaced");
            }
            text.into_owned()
        },
        None => {
            log::warn!("unknown charset {label}, decoding as UTF-8");
            String::from_utf8_lossy(body).into_owned()
        },
    }
}
