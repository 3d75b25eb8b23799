//! The document widget of a Gemini browser.
//!
//! A [`DocumentWidget`] fetches a page, typesets it as it streams in, and
//! draws it through a [`canvas::Canvas`] with smooth scrolling, link
//! hover, selection, find-in-page and inline media. Network progress
//! arrives as [`events::Notification`]s on the UI thread; the widget
//! reports back to its host with [`events::DocumentEvent`]s.

pub mod canvas;
pub mod classify;
pub mod commands;
pub mod config;
pub mod decode;
pub mod events;
pub mod fetch;
pub mod focus;
pub mod gemini;
pub mod history;
pub mod layout;
pub mod mark;
pub mod media;
pub mod menu;
pub mod ordinal;
pub mod save;
pub mod scroll;
pub mod visbuf;
pub mod visible;
pub mod widget;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports of what a host needs to embed the widget.
pub use canvas::{Canvas, TextureId};
pub use commands::Command;
pub use config::DocumentConfig;
pub use events::{DocumentEvent, Notification, OpenMode, SessionId};
pub use fetch::{Fetcher, NetFetcher};
pub use widget::{CursorShape, DocumentWidget, RequestState, Services, TrustIndicator};
