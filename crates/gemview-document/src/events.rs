//! Messages into and out of the document widget.
//!
//! [`Notification`]s travel from background threads to the UI thread over
//! an mpsc channel. [`DocumentEvent`]s are what the widget tells its host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use gemview_net::{RequestId, RequestListener};

pub use crate::focus::SessionId;
use crate::layout::LinkId;
use crate::menu::MenuItem;

/// Posted by background threads for the UI thread to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    ResponseUpdated(SessionId, RequestId),
    ResponseFinished(SessionId, RequestId),
    MediaUpdated(SessionId, LinkId, RequestId),
    MediaFinished(SessionId, LinkId, RequestId),
    PlayerUpdate(SessionId),
}

impl Notification {
    pub fn session(&self) -> SessionId {
        match *self {
            Notification::ResponseUpdated(s, _)
            | Notification::ResponseFinished(s, _)
            | Notification::MediaUpdated(s, _, _)
            | Notification::MediaFinished(s, _, _)
            | Notification::PlayerUpdate(s) => s,
        }
    }
}

/// What a [`Notifier`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    Document,
    Media(LinkId),
}

/// Forwards request progress to the UI thread.
///
/// Update notifications are coalesced: while one is queued and not yet
/// processed, further updates are dropped. The UI thread calls
/// [`Notifier::clear_pending`] before it looks at the response.
pub struct Notifier {
    session: SessionId,
    target: NotifyTarget,
    tx: Sender<Notification>,
    pending: AtomicBool,
}

impl Notifier {
    pub fn new(session: SessionId, target: NotifyTarget, tx: Sender<Notification>) -> Arc<Self> {
        Arc::new(Self {
            session,
            target,
            tx,
            pending: AtomicBool::new(false),
        })
    }

    pub fn clear_pending(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    fn post(&self, n: Notification) {
        if self.tx.send(n).is_err() {
            log::debug!("session {}: notification dropped, receiver gone", self.session.0);
        }
    }
}

impl RequestListener for Notifier {
    fn updated(&self, id: RequestId) {
        if self.pending.swap(true, Ordering::SeqCst) {
            return;
        }
        self.post(match self.target {
            NotifyTarget::Document => Notification::ResponseUpdated(self.session, id),
            NotifyTarget::Media(link) => Notification::MediaUpdated(self.session, link, id),
        });
    }

    fn finished(&self, id: RequestId) {
        self.post(match self.target {
            NotifyTarget::Document => Notification::ResponseFinished(self.session, id),
            NotifyTarget::Media(link) => Notification::MediaFinished(self.session, link, id),
        });
    }
}

/// How a link should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Current,
    NewTab,
    BackgroundTab,
    /// Hand to the system default browser.
    DefaultBrowser,
    /// Open directly, bypassing the configured proxy.
    NoProxy,
}

/// Emitted by the widget for its host.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    RequestStarted { url: String },
    RequestUpdated { url: String },
    RequestFinished { url: String },
    RequestCancelled { url: String },
    Changed { url: String },
    InputRequested {
        url: String,
        prompt: String,
        sensitive: bool,
    },
    Open { url: String, mode: OpenMode },
    WindowTitle(String),
    Clipboard(String),
    /// One-shot user-visible message.
    Message(String),
    ContextMenu(Vec<MenuItem>),
}

impl DocumentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentEvent::RequestStarted { .. } => "document.request.started",
            DocumentEvent::RequestUpdated { .. } => "document.request.updated",
            DocumentEvent::RequestFinished { .. } => "document.request.finished",
            DocumentEvent::RequestCancelled { .. } => "document.request.cancelled",
            DocumentEvent::Changed { .. } => "document.changed",
            DocumentEvent::InputRequested { .. } => "document.input",
            DocumentEvent::Open { .. } => "open",
            DocumentEvent::WindowTitle(_) => "window.title",
            DocumentEvent::Clipboard(_) => "clipboard.copy",
            DocumentEvent::Message(_) => "message",
            DocumentEvent::ContextMenu(_) => "menu.open",
        }
    }
}
