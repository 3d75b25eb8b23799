//! Gemini networking for gemview.
//!
//! A [`request::FetchSession`] owns one in-flight request. The provided
//! [`request::GeminiRequest`] runs it on a background thread, writing the
//! response under a mutex and reporting progress through a
//! [`request::RequestListener`]. The UI side never blocks on the network.

pub mod certs;
pub mod request;
pub mod response;
pub mod status;
pub mod transport;
pub mod url;

#[cfg(feature = "tls-rustls")]
pub mod tls;

pub use request::{FetchSession, GeminiRequest, RequestId, RequestListener, ResponseGuard};
pub use response::{CertFlags, Response};
pub use status::{Category, StatusCode};
pub use url::Url;
