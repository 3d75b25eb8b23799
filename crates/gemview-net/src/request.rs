//! Fetch sessions: one in-flight request whose response is filled in by a
//! background thread and read by the UI thread.

use std::io::{ErrorKind, Read, Write};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use chrono::Utc;
use gemview_types::error::{GemviewError, Result};

use crate::certs::CertStore;
use crate::response::{CertFlags, Response};
use crate::status::{self, StatusCode};
use crate::transport::{PeerCertificate, Transport};
use crate::url::{Url, percent_decode};

/// Identity of a request. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RequestId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Receives progress notifications. Called from the request's background
/// thread, so implementations must only hand the notification off.
pub trait RequestListener: Send + Sync {
    /// New bytes (or the header) arrived.
    fn updated(&self, id: RequestId);
    /// The request completed, successfully or not.
    fn finished(&self, id: RequestId);
}

/// Locked access to a session's response. Dropping the guard unlocks.
pub struct ResponseGuard<'a>(MutexGuard<'a, Response>);

impl<'a> ResponseGuard<'a> {
    pub fn new(guard: MutexGuard<'a, Response>) -> Self {
        Self(guard)
    }
}

impl Deref for ResponseGuard<'_> {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.0
    }
}

impl DerefMut for ResponseGuard<'_> {
    fn deref_mut(&mut self) -> &mut Response {
        &mut self.0
    }
}

/// Lock a response mutex, recovering the data if a writer panicked.
pub fn lock_response(m: &Mutex<Response>) -> ResponseGuard<'_> {
    ResponseGuard::new(m.lock().unwrap_or_else(|e| e.into_inner()))
}

/// One in-flight request.
pub trait FetchSession: Send {
    fn id(&self) -> RequestId;
    fn url(&self) -> &str;
    /// Start the request. Notifications begin after this.
    fn submit(&mut self);
    /// Stop the request. No notifications follow a cancel.
    fn cancel(&mut self);
    fn status(&self) -> StatusCode;
    fn is_finished(&self) -> bool;
    fn lock_response(&self) -> ResponseGuard<'_>;
    fn body_size(&self) -> usize {
        self.lock_response().body.len()
    }
}

// ---------------------------------------------------------------------------
// Threaded Gemini request
// ---------------------------------------------------------------------------

/// Largest body accepted before the request is cut off (32 MB).
const MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

const CHUNK_SIZE: usize = 8192;

struct Shared {
    response: Mutex<Response>,
    finished: AtomicBool,
    cancelled: AtomicBool,
}

/// A Gemini (or `file:`) request executed on its own thread.
pub struct GeminiRequest {
    id: RequestId,
    url: String,
    transport: Arc<dyn Transport>,
    certs: Option<Arc<dyn CertStore>>,
    listener: Option<Arc<dyn RequestListener>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl GeminiRequest {
    pub fn new(url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: RequestId::next(),
            url: url.to_string(),
            transport,
            certs: None,
            listener: None,
            shared: Arc::new(Shared {
                response: Mutex::new(Response::default()),
                finished: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
            }),
            worker: None,
        }
    }

    pub fn with_certs(mut self, certs: Arc<dyn CertStore>) -> Self {
        self.certs = Some(certs);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn RequestListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Block until the worker thread exits. Intended for tools and tests.
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl FetchSession for GeminiRequest {
    fn id(&self) -> RequestId {
        self.id
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn submit(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let job = Job {
            id: self.id,
            url: self.url.clone(),
            transport: Arc::clone(&self.transport),
            certs: self.certs.clone(),
            listener: self.listener.clone(),
            shared: Arc::clone(&self.shared),
        };
        log::debug!("request {} submitted: {}", self.id.0, self.url);
        self.worker = Some(std::thread::spawn(move || job.run()));
    }

    fn cancel(&mut self) {
        if !self.shared.cancelled.swap(true, Ordering::SeqCst) {
            log::debug!("request {} cancelled", self.id.0);
        }
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

impl Drop for GeminiRequest {
    fn drop(&mut self) {
        // The worker notices the flag at its next read and exits on its own.
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }
}

struct Job {
    id: RequestId,
    url: String,
    transport: Arc<dyn Transport>,
    certs: Option<Arc<dyn CertStore>>,
    listener: Option<Arc<dyn RequestListener>>,
    shared: Arc<Shared>,
}

impl Job {
    fn run(self) {
        let outcome = match Url::parse(&self.url) {
            Some(url) if url.scheme == "file" => self.read_file(&url),
            Some(url) => self.fetch(&url),
            None => Err(GemviewError::Network(format!("invalid URL: {}", self.url))),
        };
        if let Err(e) = outcome {
            let mut resp = lock_response(&self.shared.response);
            if resp.status.is_success() {
                // The header stands; the body is whatever arrived.
                log::warn!(
                    "request {}: body cut short after {} bytes: {e}",
                    self.id.0,
                    resp.body.len()
                );
            } else {
                log::warn!("request {} failed: {e}", self.id.0);
                if resp.status == StatusCode::NONE {
                    resp.status = StatusCode::TLS_FAILURE;
                    resp.meta = e.to_string();
                }
            }
        }
        self.shared.finished.store(true, Ordering::SeqCst);
        if !self.is_cancelled() {
            if let Some(listener) = &self.listener {
                listener.finished(self.id);
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    fn notify_updated(&self) {
        if !self.is_cancelled() {
            if let Some(listener) = &self.listener {
                listener.updated(self.id);
            }
        }
    }

    fn fetch(&self, url: &Url) -> Result<()> {
        let mut conn = self.transport.connect(url)?;
        conn.stream.write_all(&status::build_request(&self.url))?;
        conn.stream.flush()?;

        let mut chunk = [0u8; CHUNK_SIZE];
        let mut head = Vec::new();
        let header_end = loop {
            if self.is_cancelled() {
                return Ok(());
            }
            let n = read_some(&mut *conn.stream, &mut chunk)?;
            if n == 0 {
                break head.windows(2).position(|w| w == b"\r\n");
            }
            head.extend_from_slice(&chunk[..n]);
            if let Some(pos) = head.windows(2).position(|w| w == b"\r\n") {
                break Some(pos);
            }
            if head.len() > status::MAX_META_LEN + 3 {
                break None;
            }
        };

        {
            let mut resp = lock_response(&self.shared.response);
            resp.when = Utc::now();
            if let Some(cert) = &conn.certificate {
                self.apply_certificate(&mut resp, url, cert);
            }
            match header_end.and_then(|pos| status::parse_header(&head[..pos]).map(|h| (pos, h)))
            {
                Some((pos, (code, meta))) => {
                    resp.status = code;
                    resp.meta = meta;
                    resp.body.extend_from_slice(&head[pos + 2..]);
                },
                None => {
                    resp.status = StatusCode::INVALID_HEADER;
                    resp.meta = String::from_utf8_lossy(&head)
                        .chars()
                        .take(64)
                        .collect();
                    return Ok(());
                },
            }
        }
        self.notify_updated();

        loop {
            if self.is_cancelled() {
                return Ok(());
            }
            let n = read_some(&mut *conn.stream, &mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            {
                let mut resp = lock_response(&self.shared.response);
                if resp.body.len() + n > MAX_BODY_SIZE {
                    log::warn!("request {}: body exceeds limit, truncating", self.id.0);
                    return Ok(());
                }
                resp.body.extend_from_slice(&chunk[..n]);
            }
            self.notify_updated();
        }
    }

    fn apply_certificate(&self, resp: &mut Response, url: &Url, cert: &PeerCertificate) {
        resp.cert_flags = CertFlags::AVAILABLE;
        resp.cert_subject = cert.subject.clone();
        resp.cert_valid_until = cert.not_after;
        resp.cert_fingerprint = cert.fingerprint.clone();
        if !cert.fingerprint.is_empty() {
            resp.cert_flags |= CertFlags::HAVE_FINGERPRINT;
        }
        if cert.not_after.is_some_and(|t| t > Utc::now()) {
            resp.cert_flags |= CertFlags::TIME_VERIFIED;
        }
        if cert.domain_verified {
            resp.cert_flags |= CertFlags::DOMAIN_VERIFIED;
        }
        if let Some(certs) = &self.certs {
            if certs.check_trust(&url.host, &cert.fingerprint, cert.not_after) {
                resp.cert_flags |= CertFlags::TRUSTED;
            }
        }
    }

    fn read_file(&self, url: &Url) -> Result<()> {
        let path = PathBuf::from(percent_decode(&url.path));
        let result = std::fs::read(&path);
        {
            let mut resp = lock_response(&self.shared.response);
            resp.when = Utc::now();
            match result {
                Ok(data) => {
                    resp.status = StatusCode::SUCCESS;
                    resp.meta = mime_for_path(&url.path).to_string();
                    resp.body = data;
                },
                Err(e) => {
                    log::debug!("cannot open {}: {e}", path.display());
                    resp.status = StatusCode::FAILED_TO_OPEN_FILE;
                    resp.meta = path.display().to_string();
                },
            }
        }
        self.notify_updated();
        Ok(())
    }
}

fn read_some(stream: &mut dyn Read, buf: &mut [u8]) -> Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(GemviewError::Network(format!("read failed: {e}"))),
        }
    }
}

/// Guess a MIME type from a file name.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("gmi" | "gemini") => "text/gemini; charset=utf-8",
        Some("txt" | "md" | "log") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wave",
        Some("mid") => "audio/midi",
        _ => "application/octet-stream",
    }
}
