//! Server certificate trust (trust on first use).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use gemview_types::error::Result;
use serde::{Deserialize, Serialize};

/// Storage for pinned server certificates.
pub trait CertStore: Send + Sync {
    /// Whether `fingerprint` is the pinned certificate for `host`.
    fn is_trusted(&self, host: &str, fingerprint: &[u8]) -> bool;

    /// Pin `fingerprint` for `host` until `expiry`.
    fn set_trusted(&self, host: &str, fingerprint: &[u8], expiry: Option<DateTime<Utc>>);

    /// Whether any certificate has been pinned for `host`.
    fn is_known(&self, host: &str) -> bool;

    /// Trust-on-first-use check: an unknown host gets its certificate
    /// pinned and is trusted; a known host must match.
    fn check_trust(&self, host: &str, fingerprint: &[u8], expiry: Option<DateTime<Utc>>) -> bool {
        if self.is_trusted(host, fingerprint) {
            return true;
        }
        if !self.is_known(host) {
            log::info!("pinning first-seen certificate for {host}");
            self.set_trusted(host, fingerprint, expiry);
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PinnedCert {
    fingerprint: Vec<u8>,
    expiry: Option<DateTime<Utc>>,
}

/// In-memory certificate store, persisted as JSON on request.
#[derive(Debug, Default)]
pub struct MemoryCertStore {
    pins: Mutex<HashMap<String, PinnedCert>>,
}

impl MemoryCertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String> {
        let pins = self.pins.lock().unwrap_or_else(|e| e.into_inner());
        Ok(serde_json::to_string_pretty(&*pins)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let pins: HashMap<String, PinnedCert> = serde_json::from_str(json)?;
        Ok(Self {
            pins: Mutex::new(pins),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load from `path`; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CertStore for MemoryCertStore {
    fn is_trusted(&self, host: &str, fingerprint: &[u8]) -> bool {
        let pins = self.pins.lock().unwrap_or_else(|e| e.into_inner());
        match pins.get(&host.to_lowercase()) {
            Some(pin) => {
                pin.fingerprint == fingerprint && pin.expiry.is_none_or(|exp| exp > Utc::now())
            },
            None => false,
        }
    }

    fn set_trusted(&self, host: &str, fingerprint: &[u8], expiry: Option<DateTime<Utc>>) {
        let mut pins = self.pins.lock().unwrap_or_else(|e| e.into_inner());
        pins.insert(
            host.to_lowercase(),
            PinnedCert {
                fingerprint: fingerprint.to_vec(),
                expiry,
            },
        );
    }

    fn is_known(&self, host: &str) -> bool {
        let pins = self.pins.lock().unwrap_or_else(|e| e.into_inner());
        pins.contains_key(&host.to_lowercase())
    }
}
