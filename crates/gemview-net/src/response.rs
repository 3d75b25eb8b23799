//! The shared response object a fetch session fills in.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::StatusCode;

bitflags! {
    /// What is known about the server certificate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CertFlags: u8 {
        const AVAILABLE = 1 << 0;
        const TRUSTED = 1 << 1;
        const TIME_VERIFIED = 1 << 2;
        const DOMAIN_VERIFIED = 1 << 3;
        const HAVE_FINGERPRINT = 1 << 4;
    }
}

/// A (possibly partial) protocol response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: StatusCode,
    /// MIME type for success, target for redirects, message otherwise.
    pub meta: String,
    pub body: Vec<u8>,
    pub cert_flags: CertFlags,
    pub cert_fingerprint: Vec<u8>,
    pub cert_valid_until: Option<DateTime<Utc>>,
    pub cert_subject: String,
    /// When the response was received.
    pub when: DateTime<Utc>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::NONE,
            meta: String::new(),
            body: Vec::new(),
            cert_flags: CertFlags::empty(),
            cert_fingerprint: Vec::new(),
            cert_valid_until: None,
            cert_subject: String::new(),
            when: Utc::now(),
        }
    }
}

impl Response {
    pub fn new(status: StatusCode, meta: impl Into<String>) -> Self {
        Self {
            status,
            meta: meta.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Every flag needed before the user may pin this certificate.
    pub fn can_trust(&self) -> bool {
        self.cert_flags.contains(
            CertFlags::AVAILABLE
                | CertFlags::HAVE_FINGERPRINT
                | CertFlags::TIME_VERIFIED
                | CertFlags::DOMAIN_VERIFIED,
        )
    }

    /// Hex rendering of the certificate fingerprint.
    pub fn fingerprint_hex(&self) -> String {
        self.cert_fingerprint
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}
