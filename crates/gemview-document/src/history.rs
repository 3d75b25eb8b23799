//! Navigation history with cached responses.
//!
//! Each visited URL remembers its normalized scroll position and, for
//! text content, the complete response so that going back and forward
//! can replay it without touching the network.

use gemview_net::Response;
use serde::{Deserialize, Serialize};

/// Maximum number of history entries kept.
pub const MAX_ENTRIES: usize = 100;

/// A visited URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUrl {
    pub url: String,
    /// Scroll position as a fraction of the document height.
    pub norm_scroll_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_response: Option<Response>,
}

impl RecentUrl {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            norm_scroll_y: 0.0,
            cached_response: None,
        }
    }

    fn cached_size(&self) -> usize {
        self.cached_response.as_ref().map_or(0, |r| r.body.len())
    }
}

/// Back/forward history of one document session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    entries: Vec<RecentUrl>,
    /// Index of the current entry. Entries after it are forward history.
    current: usize,
    #[serde(skip, default = "default_cache_budget")]
    max_cache_bytes: usize,
}

fn default_cache_budget() -> usize {
    10 * 1024 * 1024
}

impl Default for History {
    fn default() -> Self {
        Self::new(default_cache_budget())
    }
}

impl History {
    pub fn new(max_cache_bytes: usize) -> Self {
        Self {
            entries: Vec::new(),
            current: 0,
            max_cache_bytes,
        }
    }

    pub fn set_cache_budget(&mut self, max_cache_bytes: usize) {
        self.max_cache_bytes = max_cache_bytes;
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = 0;
    }

    pub fn current(&self) -> Option<&RecentUrl> {
        self.entries.get(self.current)
    }

    /// Record a navigation to `url`. Forward history is discarded.
    /// Revisiting the current URL does nothing.
    pub fn add_url(&mut self, url: &str) {
        if self
            .current()
            .is_some_and(|e| e.url.eq_ignore_ascii_case(url))
        {
            return;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.current + 1);
        }
        self.entries.push(RecentUrl::new(url));
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(..excess);
        }
        self.current = self.entries.len() - 1;
    }

    /// Newest entry for `url`, compared case-insensitively.
    pub fn find_url(&self, url: &str) -> Option<&RecentUrl> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.url.eq_ignore_ascii_case(url))
    }

    pub fn cached_response(&self, url: &str) -> Option<&Response> {
        // Prefer the current entry; otherwise the newest cached one.
        if let Some(e) = self.current().filter(|e| e.url.eq_ignore_ascii_case(url)) {
            if e.cached_response.is_some() {
                return e.cached_response.as_ref();
            }
        }
        self.entries
            .iter()
            .rev()
            .filter(|e| e.url.eq_ignore_ascii_case(url))
            .find_map(|e| e.cached_response.as_ref())
    }

    /// Cache `response` in the current entry.
    pub fn set_cached_response(&mut self, response: &Response) {
        let Some(entry) = self.entries.get_mut(self.current) else {
            return;
        };
        entry.cached_response = Some(response.clone());
        self.evict();
    }

    /// Drop cached responses, oldest first, until within budget. The
    /// current entry's response is kept.
    fn evict(&mut self) {
        let mut total: usize = self.entries.iter().map(RecentUrl::cached_size).sum();
        for i in 0..self.entries.len() {
            if total <= self.max_cache_bytes {
                break;
            }
            if i == self.current {
                continue;
            }
            let size = self.entries[i].cached_size();
            if size > 0 {
                log::debug!("history: evicting cached {}", self.entries[i].url);
                self.entries[i].cached_response = None;
                total -= size;
            }
        }
    }

    pub fn cache_size(&self) -> usize {
        self.entries.iter().map(RecentUrl::cached_size).sum()
    }

    pub fn most_recent_mut(&mut self) -> Option<&mut RecentUrl> {
        self.entries.get_mut(self.current)
    }

    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty() && self.current > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    /// Step back. Returns the entry to load.
    pub fn go_back(&mut self) -> Option<&RecentUrl> {
        if !self.can_go_back() {
            return None;
        }
        self.current -= 1;
        self.entries.get(self.current)
    }

    /// Step forward. Returns the entry to load.
    pub fn go_forward(&mut self) -> Option<&RecentUrl> {
        if !self.can_go_forward() {
            return None;
        }
        self.current += 1;
        self.entries.get(self.current)
    }
}
