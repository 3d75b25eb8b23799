//! Document viewer preferences.

use std::path::{Path, PathBuf};

use gemview_types::error::{GemviewError, Result};
use serde::Deserialize;

/// Preferences consulted by the document widget.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Animate scrolling. When off every scroll is instant.
    pub smooth_scrolling: bool,
    /// Duration of a smooth vertical scroll step.
    pub smooth_duration_ms: u32,
    /// Duration of an animated horizontal scroll of a wide block.
    pub wide_scroll_duration_ms: u32,
    /// Base UI spacing unit in pixels.
    pub gap: i32,
    /// Page margin, in gap units.
    pub page_margin: i32,
    /// Body font size in pixels.
    pub font_size: i32,
    /// Maximum line width in font-size units.
    pub line_width: i32,
    pub zoom_percent: i32,
    pub scrollbar_width: i32,
    /// Paging forward first loads the next visible unfetched image.
    pub load_image_instead_of_scrolling: bool,
    /// Show the outline when hovering over the side area.
    pub hover_outline: bool,
    /// Center documents shorter than the viewport vertically.
    pub center_short_docs: bool,
    /// Skip letters the platform reserves for shortcuts in link ordinals.
    pub reserve_platform_keys: bool,
    pub max_redirects: u8,
    /// Budget for response bodies cached in the navigation history.
    pub max_cache_mb: usize,
    pub downloads_dir: PathBuf,
    pub gemini_proxy: Option<String>,
    pub http_proxy: Option<String>,
    /// Used in window titles when a page has nothing better.
    pub app_name: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            smooth_scrolling: true,
            smooth_duration_ms: 600,
            wide_scroll_duration_ms: 167,
            gap: 4,
            page_margin: 5,
            font_size: 16,
            line_width: 40,
            zoom_percent: 100,
            scrollbar_width: 12,
            load_image_instead_of_scrolling: false,
            hover_outline: false,
            center_short_docs: false,
            reserve_platform_keys: cfg!(target_os = "macos"),
            max_redirects: 5,
            max_cache_mb: 10,
            downloads_dir: default_downloads_dir(),
            gemini_proxy: None,
            http_proxy: None,
            app_name: "Gemview".to_string(),
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl DocumentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: DocumentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.gap <= 0 {
            return Err(GemviewError::Config(format!("gap must be positive, got {}", self.gap)));
        }
        if self.font_size <= 0 || self.line_width <= 0 || self.zoom_percent <= 0 {
            return Err(GemviewError::Config(
                "font_size, line_width and zoom_percent must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Page margin in pixels.
    pub fn margin_px(&self) -> i32 {
        self.page_margin * self.gap
    }

    /// Whether links of `scheme` are routed through a proxy.
    pub fn will_use_proxy(&self, scheme: &str) -> bool {
        match scheme {
            "gemini" => self.gemini_proxy.is_some(),
            "http" | "https" => self.http_proxy.is_some(),
            _ => false,
        }
    }
}
