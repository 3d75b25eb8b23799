//! Per-frame tickers.
//!
//! A ticker is a one-shot request to be called back on the next frame.
//! Callers that still have work to animate re-register from inside their
//! callback; once nothing is registered the host can stop producing frames.

/// Pending per-frame callbacks, identified by a caller-defined key.
#[derive(Debug, Clone)]
pub struct Ticker<K> {
    pending: Vec<K>,
}

impl<K> Default for Ticker<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> Ticker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a callback for `key` on the next frame. Duplicate requests
    /// within one frame collapse into one.
    pub fn add(&mut self, key: K) {
        if !self.pending.contains(&key) {
            self.pending.push(key);
        }
    }

    pub fn remove(&mut self, key: K) {
        self.pending.retain(|k| *k != key);
    }

    pub fn contains(&self, key: K) -> bool {
        self.pending.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take everything due this frame, in registration order.
    pub fn take(&mut self) -> Vec<K> {
        std::mem::take(&mut self.pending)
    }
}
