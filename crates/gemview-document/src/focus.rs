//! Which document session is the active one.
//!
//! Only the active session drives the window title and the player refresh
//! timer. Sessions query a shared [`FocusRegistry`] handle instead of a
//! global.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of a document session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shared handle to the active session id.
#[derive(Debug, Clone, Default)]
pub struct FocusRegistry {
    active: Arc<AtomicU64>,
}

impl FocusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&self, id: SessionId) {
        self.active.store(id.0, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.active.store(0, Ordering::SeqCst);
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.active.load(Ordering::SeqCst) == id.0
    }

    pub fn active(&self) -> Option<SessionId> {
        match self.active.load(Ordering::SeqCst) {
            0 => None,
            id => Some(SessionId(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_active_session() {
        let focus = FocusRegistry::new();
        let a = SessionId::next();
        let b = SessionId::next();
        assert_eq!(focus.active(), None);
        focus.set_active(a);
        let other = focus.clone();
        assert!(other.is_active(a));
        assert!(!other.is_active(b));
        other.set_active(b);
        assert!(!focus.is_active(a));
        focus.clear();
        assert_eq!(focus.active(), None);
    }
}
