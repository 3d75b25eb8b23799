//! Saving page content and inline media to the downloads directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use gemview_net::Url;
use gemview_net::url::percent_decode;
use gemview_types::error::{GemviewError, Result};

/// Inserted before the extension when the name is taken.
const TIMESTAMP_FORMAT: &str = "_%Y-%m-%d_%H%M%S";

/// A file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub path: PathBuf,
    pub size: usize,
}

impl Saved {
    /// Message shown after a successful save.
    pub fn message(&self) -> String {
        format!(
            "Saved to Downloads\n{}\nSize: {}",
            self.path.display(),
            size_label(self.size)
        )
    }
}

pub fn size_label(bytes: usize) -> String {
    const MB: f64 = 1.0e6;
    if (bytes as f64) < MB {
        format!("{:.1} KB", bytes as f64 / 1.0e3)
    } else {
        format!("{:.3} MB", bytes as f64 / MB)
    }
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let mime = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if mime == "text/gemini" {
        Some("gmi".into())
    } else if mime.starts_with("text/") {
        Some("txt".into())
    } else {
        mime.strip_prefix("image/")
            .filter(|sub| !sub.is_empty())
            .map(str::to_string)
    }
}

/// File name to save `url` as.
///
/// The last path segment is used when there is one; otherwise the host
/// with dots replaced, and `pagecontent` as a last resort. An extension is
/// added from `mime` when the name has none.
pub fn download_file_name(url: &str, mime: &str) -> String {
    let parsed = Url::parse(url);
    let base = parsed
        .as_ref()
        .and_then(|u| u.path.rsplit('/').next())
        .map(percent_decode)
        .unwrap_or_default();
    let mut name = if !base.is_empty() {
        base
    } else if let Some(u) = parsed.as_ref().filter(|u| !u.host.is_empty()) {
        u.host.replace('.', "_")
    } else {
        "pagecontent".to_string()
    };
    if let Some(stripped) = name.strip_prefix('~') {
        name = stripped.to_string();
    }
    // Path separators have no business in a file name.
    name = name.replace(['/', '\\'], "_");
    if Path::new(&name).extension().is_none() {
        if let Some(ext) = extension_for_mime(mime) {
            name.push('.');
            name.push_str(&ext);
        }
    }
    name
}

fn with_timestamp(name: &str, now: DateTime<Local>) -> String {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    match name.rfind('.').filter(|&i| i > 0) {
        Some(dot) => format!("{}{stamp}{}", &name[..dot], &name[dot..]),
        None => format!("{name}{stamp}"),
    }
}

/// Write `content` into `dir` under a name derived from `url` and `mime`.
///
/// The data goes to a temporary `.part` file first and is renamed into
/// place, so a failed save never leaves a truncated file behind.
pub fn save_to_downloads(
    dir: &Path,
    url: &str,
    mime: &str,
    content: &[u8],
    now: DateTime<Local>,
) -> Result<Saved> {
    fs::create_dir_all(dir)?;
    let mut name = download_file_name(url, mime);
    if dir.join(&name).exists() {
        name = with_timestamp(&name, now);
    }
    let path = dir.join(&name);
    let part = dir.join(format!("{name}.part"));
    if let Err(e) = fs::write(&part, content).and_then(|()| fs::rename(&part, &path)) {
        let _ = fs::remove_file(&part);
        return Err(GemviewError::Save(format!("{}: {e}", path.display())));
    }
    log::info!("saved {} bytes to {}", content.len(), path.display());
    Ok(Saved {
        path,
        size: content.len(),
    })
}
