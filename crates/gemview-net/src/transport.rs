//! Byte transports a request runs over.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use gemview_types::error::{GemviewError, Result};

use crate::url::Url;

/// A bidirectional byte stream.
pub trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

/// What the transport learned about the server certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerCertificate {
    pub fingerprint: Vec<u8>,
    pub subject: String,
    pub not_after: Option<DateTime<Utc>>,
    /// Whether the certificate names the requested host.
    pub domain_verified: bool,
}

/// An open connection.
pub struct Connection {
    pub stream: Box<dyn Stream>,
    pub certificate: Option<PeerCertificate>,
}

/// Opens connections to servers.
pub trait Transport: Send + Sync {
    fn connect(&self, url: &Url) -> Result<Connection>;
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

/// Serves canned raw responses (header line included) keyed by URL.
///
/// Useful for offline rendering and for exercising the request state
/// machine without sockets.
#[derive(Default)]
pub struct MemoryTransport {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    certificate: Option<PeerCertificate>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `cert` for every connection.
    pub fn with_certificate(mut self, cert: PeerCertificate) -> Self {
        self.certificate = Some(cert);
        self
    }

    /// Register the raw response returned for `url`.
    pub fn insert(&self, url: &str, raw: impl Into<Vec<u8>>) {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.insert(url.to_string(), raw.into());
    }
}

impl Transport for MemoryTransport {
    fn connect(&self, url: &Url) -> Result<Connection> {
        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        let raw = responses
            .get(&url.to_string())
            .cloned()
            .ok_or_else(|| GemviewError::Network(format!("connection refused: {}", url.host)))?;
        Ok(Connection {
            stream: Box::new(MemoryStream::new(raw)),
            certificate: self.certificate.clone(),
        })
    }
}

/// A stream reading from a fixed buffer and recording what is written.
pub struct MemoryStream {
    input: Cursor<Vec<u8>>,
    written: Vec<u8>,
}

impl MemoryStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_transport_serves_registered_url() {
        let t = MemoryTransport::new();
        t.insert("gemini://example.org/", b"20 text/gemini\r\n# Hi".to_vec());
        let url = Url::parse("gemini://example.org/").unwrap();
        let mut conn = t.connect(&url).unwrap();
        let mut out = Vec::new();
        conn.stream.read_to_end(&mut out).unwrap();
        assert!(out.starts_with(b"20 "));
        assert!(conn.certificate.is_none());
    }

    #[test]
    fn memory_transport_refuses_unknown_url() {
        let t = MemoryTransport::new();
        let url = Url::parse("gemini://nowhere.example/").unwrap();
        let err = t.connect(&url).err().unwrap();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn memory_stream_records_writes() {
        let mut s = MemoryStream::new(Vec::new());
        s.write_all(b"gemini://x/\r\n").unwrap();
        assert_eq!(s.written(), b"gemini://x/\r\n");
    }
}
