//! Shared test utilities for the document widget.
//!
//! Provides a [`MockCanvas`] that records draw calls and a scriptable
//! [`MockFetcher`] whose sessions are fed by the test instead of a server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gemview_net::request::lock_response;
use gemview_net::{FetchSession, RequestId, RequestListener, Response, ResponseGuard, StatusCode};
use gemview_types::error::Result;
use gemview_types::geometry::{Int2, Rect};
use gemview_types::palette::{ColorId, FontId};

use crate::canvas::{Canvas, TextureId};
use crate::fetch::Fetcher;
use crate::media::MediaId;

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum DrawCall {
    CreateTarget { tex: TextureId, size: Int2 },
    DestroyTexture { tex: TextureId },
    BeginTarget { tex: TextureId },
    EndTarget,
    FillRect { rect: Rect, color: ColorId },
    DrawText {
        text: String,
        pos: Int2,
        font: FontId,
        color: ColorId,
    },
    DrawImage { image: MediaId, rect: Rect },
    Blit { tex: TextureId, pos: Int2 },
    SetClip { rect: Rect },
    ResetClip,
}

/// A canvas that records all draw calls for assertions.
#[derive(Debug, Default)]
pub struct MockCanvas {
    pub calls: Vec<DrawCall>,
    next_tex: u64,
    live: Vec<TextureId>,
}

impl MockCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn live_textures(&self) -> usize {
        self.live.len()
    }

    pub fn fill_rect_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::FillRect { .. }))
            .count()
    }

    pub fn draw_text_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::DrawText { .. }))
            .count()
    }

    pub fn blit_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Blit { .. }))
            .count()
    }

    /// Check if any `DrawText` call contains the given substring.
    pub fn has_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Fills in `color`.
    pub fn fills_of(&self, color: ColorId) -> Vec<Rect> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::FillRect { rect, color: c } if *c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for MockCanvas {
    fn create_target(&mut self, size: Int2) -> Result<TextureId> {
        self.next_tex += 1;
        let tex = TextureId(self.next_tex);
        self.live.push(tex);
        self.calls.push(DrawCall::CreateTarget { tex, size });
        Ok(tex)
    }

    fn destroy_texture(&mut self, tex: TextureId) -> Result<()> {
        self.live.retain(|t| *t != tex);
        self.calls.push(DrawCall::DestroyTexture { tex });
        Ok(())
    }

    fn begin_target(&mut self, tex: TextureId) -> Result<()> {
        self.calls.push(DrawCall::BeginTarget { tex });
        Ok(())
    }

    fn end_target(&mut self) -> Result<()> {
        self.calls.push(DrawCall::EndTarget);
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, color: ColorId) -> Result<()> {
        self.calls.push(DrawCall::FillRect { rect, color });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, pos: Int2, font: FontId, color: ColorId) -> Result<()> {
        self.calls.push(DrawCall::DrawText {
            text: text.to_string(),
            pos,
            font,
            color,
        });
        Ok(())
    }

    fn draw_image(&mut self, image: MediaId, _data: &[u8], rect: Rect) -> Result<()> {
        self.calls.push(DrawCall::DrawImage { image, rect });
        Ok(())
    }

    fn blit(&mut self, tex: TextureId, pos: Int2) -> Result<()> {
        self.calls.push(DrawCall::Blit { tex, pos });
        Ok(())
    }

    fn set_clip_rect(&mut self, rect: Rect) -> Result<()> {
        self.calls.push(DrawCall::SetClip { rect });
        Ok(())
    }

    fn reset_clip_rect(&mut self) -> Result<()> {
        self.calls.push(DrawCall::ResetClip);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scriptable fetch sessions
// ---------------------------------------------------------------------------

struct MockShared {
    response: Mutex<Response>,
    finished: AtomicBool,
    submitted: AtomicBool,
    cancelled: AtomicBool,
}

/// Test-side handle to a session made by [`MockFetcher`].
#[derive(Clone)]
pub struct MockHandle {
    pub id: RequestId,
    pub url: String,
    shared: Arc<MockShared>,
    listener: Arc<dyn RequestListener>,
}

impl MockHandle {
    /// Deliver a header (and no body yet).
    pub fn header(&self, status: StatusCode, meta: &str) {
        {
            let mut resp = lock_response(&self.shared.response);
            resp.status = status;
            resp.meta = meta.to_string();
        }
        self.notify_updated();
    }

    /// Append body bytes.
    pub fn body(&self, bytes: &[u8]) {
        lock_response(&self.shared.response).body.extend_from_slice(bytes);
        self.notify_updated();
    }

    pub fn edit(&self, f: impl FnOnce(&mut Response)) {
        f(&mut lock_response(&self.shared.response));
    }

    pub fn finish(&self) {
        self.shared.finished.store(true, Ordering::SeqCst);
        if !self.is_cancelled() {
            self.listener.finished(self.id);
        }
    }

    /// Header, whole body and finish in one go.
    pub fn respond(&self, status: StatusCode, meta: &str, body: &[u8]) {
        self.header(status, meta);
        if !body.is_empty() {
            self.body(body);
        }
        self.finish();
    }

    pub fn is_submitted(&self) -> bool {
        self.shared.submitted.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    fn notify_updated(&self) {
        if !self.is_cancelled() {
            self.listener.updated(self.id);
        }
    }
}

/// The session half handed to the widget.
pub struct MockFetch {
    id: RequestId,
    url: String,
    shared: Arc<MockShared>,
}

impl FetchSession for MockFetch {
    fn id(&self) -> RequestId {
        self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn submit(&mut self) {
        self.shared.submitted.store(true, Ordering::SeqCst);
    }

    fn cancel(&mut self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }

    fn status(&self) -> StatusCode {
        lock_response(&self.shared.response).status
    }

    fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }

    fn lock_response(&self) -> ResponseGuard<'_> {
        lock_response(&self.shared.response)
    }
}

/// Records every session it makes; tests script them through
/// [`MockHandle`]s.
#[derive(Default)]
pub struct MockFetcher {
    sessions: Mutex<Vec<MockHandle>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Most recently created session.
    pub fn last(&self) -> MockHandle {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
            .expect("no fetch made")
    }

    /// Most recent session for `url`.
    pub fn for_url(&self, url: &str) -> Option<MockHandle> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|h| h.url == url)
            .cloned()
    }

    pub fn urls(&self) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|h| h.url.clone())
            .collect()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str, listener: Arc<dyn RequestListener>) -> Box<dyn FetchSession> {
        let shared = Arc::new(MockShared {
            response: Mutex::new(Response::default()),
            finished: AtomicBool::new(false),
            submitted: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        });
        let id = RequestId::next();
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockHandle {
                id,
                url: url.to_string(),
                shared: Arc::clone(&shared),
                listener,
            });
        Box::new(MockFetch {
            id,
            url: url.to_string(),
            shared,
        })
    }
}
