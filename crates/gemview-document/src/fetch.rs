//! Creating fetch sessions for the widget.

use std::sync::Arc;

use gemview_net::certs::CertStore;
use gemview_net::transport::Transport;
use gemview_net::{FetchSession, GeminiRequest, RequestListener};

/// Makes a fresh, not yet submitted session for `url`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, listener: Arc<dyn RequestListener>) -> Box<dyn FetchSession>;
}

/// Threaded Gemini requests over a shared transport.
pub struct NetFetcher {
    transport: Arc<dyn Transport>,
    certs: Arc<dyn CertStore>,
}

impl NetFetcher {
    pub fn new(transport: Arc<dyn Transport>, certs: Arc<dyn CertStore>) -> Self {
        Self { transport, certs }
    }
}

impl Fetcher for NetFetcher {
    fn fetch(&self, url: &str, listener: Arc<dyn RequestListener>) -> Box<dyn FetchSession> {
        Box::new(
            GeminiRequest::new(url, Arc::clone(&self.transport))
                .with_certs(Arc::clone(&self.certs))
                .with_listener(listener),
        )
    }
}
