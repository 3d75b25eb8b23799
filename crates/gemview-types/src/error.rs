//! Error types for gemview.

use std::io;

/// Errors produced by the gemview crates.
#[derive(Debug, thiserror::Error)]
pub enum GemviewError {
    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("save error: {0}")]
    Save(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GemviewError>;
