//! Gemini status codes, the local error codes layered on top of them, and
//! the human-readable description of each error.

use serde::{Deserialize, Serialize};

/// A response status.
///
/// Positive values are two-digit codes received from a server. Negative
/// values are produced locally when a response cannot be used as-is
/// (navigation policy violations, decode failures, network errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i16);

impl StatusCode {
    pub const NONE: Self = Self(0);

    pub const INPUT: Self = Self(10);
    pub const SENSITIVE_INPUT: Self = Self(11);
    pub const SUCCESS: Self = Self(20);
    pub const REDIRECT_TEMPORARY: Self = Self(30);
    pub const REDIRECT_PERMANENT: Self = Self(31);
    pub const TEMPORARY_FAILURE: Self = Self(40);
    pub const SERVER_UNAVAILABLE: Self = Self(41);
    pub const CGI_ERROR: Self = Self(42);
    pub const PROXY_ERROR: Self = Self(43);
    pub const SLOW_DOWN: Self = Self(44);
    pub const PERMANENT_FAILURE: Self = Self(50);
    pub const NOT_FOUND: Self = Self(51);
    pub const GONE: Self = Self(52);
    pub const PROXY_REQUEST_REFUSED: Self = Self(53);
    pub const BAD_REQUEST: Self = Self(59);
    pub const CLIENT_CERTIFICATE_REQUIRED: Self = Self(60);
    pub const CERTIFICATE_NOT_AUTHORIZED: Self = Self(61);
    pub const CERTIFICATE_NOT_VALID: Self = Self(62);

    pub const INVALID_REDIRECT: Self = Self(-1);
    pub const SCHEME_CHANGE_REDIRECT: Self = Self(-2);
    pub const TOO_MANY_REDIRECTS: Self = Self(-3);
    pub const UNSUPPORTED_MIME_TYPE: Self = Self(-4);
    pub const FAILED_TO_OPEN_FILE: Self = Self(-5);
    pub const INVALID_HEADER: Self = Self(-6);
    pub const UNKNOWN_STATUS_CODE: Self = Self(-7);
    pub const TLS_FAILURE: Self = Self(-8);

    pub fn category(self) -> Category {
        match self.0 {
            0 => Category::None,
            10..=19 => Category::Input,
            20..=29 => Category::Success,
            30..=39 => Category::Redirect,
            40..=49 => Category::TemporaryFailure,
            50..=59 => Category::PermanentFailure,
            60..=69 => Category::ClientCertificate,
            i16::MIN..=-1 => Category::Local,
            _ => Category::Unknown,
        }
    }

    pub fn is_success(self) -> bool {
        self.category() == Category::Success
    }

    pub fn is_redirect(self) -> bool {
        self.category() == Category::Redirect
    }

    /// Whether the code has an entry in the error table.
    pub fn is_defined_error(self) -> bool {
        error_info(self).is_some()
    }

    /// The code to display for this status: defined errors keep their own
    /// entry, other failures fall back to their category's generic entry.
    pub fn display_error(self) -> StatusCode {
        if self.is_defined_error() {
            return self;
        }
        match self.category() {
            Category::TemporaryFailure => StatusCode::TEMPORARY_FAILURE,
            Category::PermanentFailure => StatusCode::PERMANENT_FAILURE,
            Category::ClientCertificate => StatusCode::CLIENT_CERTIFICATE_REQUIRED,
            _ => StatusCode::UNKNOWN_STATUS_CODE,
        }
    }
}

/// Status code families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    None,
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    ClientCertificate,
    /// Produced locally, never sent by a server.
    Local,
    /// A two-digit code outside every family.
    Unknown,
}

/// Presentation of an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    pub icon: char,
    pub title: &'static str,
    pub info: &'static str,
}

const ERRORS: &[(StatusCode, ErrorInfo)] = &[
    (StatusCode::UNKNOWN_STATUS_CODE, ErrorInfo {
        icon: '\u{1f4ab}',
        title: "Unknown Status Code",
        info: "The server responded with a status code that is not part of the Gemini protocol. The server may be malfunctioning.",
    }),
    (StatusCode::FAILED_TO_OPEN_FILE, ErrorInfo {
        icon: '\u{1f4c1}',
        title: "Failed to Open File",
        info: "The requested file does not exist or cannot be read. Check the file path.",
    }),
    (StatusCode::INVALID_HEADER, ErrorInfo {
        icon: '\u{1f4ab}',
        title: "Unrecognized Response",
        info: "The server sent a response header that could not be understood.",
    }),
    (StatusCode::UNSUPPORTED_MIME_TYPE, ErrorInfo {
        icon: '\u{1f47d}',
        title: "Unsupported Content Type",
        info: "The received content is in a format this viewer cannot display.",
    }),
    (StatusCode::INVALID_REDIRECT, ErrorInfo {
        icon: '\u{27a0}',
        title: "Invalid Redirect",
        info: "The server asked for a redirect but did not provide a destination. The server may be malfunctioning.",
    }),
    (StatusCode::SCHEME_CHANGE_REDIRECT, ErrorInfo {
        icon: '\u{27a0}',
        title: "Scheme-Changing Redirect",
        info: "The server wants to redirect to a URL with a different scheme than the original. The destination is linked below so it can be opened manually if appropriate.",
    }),
    (StatusCode::TOO_MANY_REDIRECTS, ErrorInfo {
        icon: '\u{27a0}',
        title: "Too Many Redirects",
        info: "The request may be stuck in a redirection loop. The next destination is linked below if you want to continue manually.",
    }),
    (StatusCode::TLS_FAILURE, ErrorInfo {
        icon: '\u{1f5a7}',
        title: "Network/TLS Failure",
        info: "Communication with the host failed. The error was:",
    }),
    (StatusCode::TEMPORARY_FAILURE, ErrorInfo {
        icon: '\u{1f50c}',
        title: "Temporary Failure",
        info: "The request failed, but may succeed if you try again later.",
    }),
    (StatusCode::SERVER_UNAVAILABLE, ErrorInfo {
        icon: '\u{1f525}',
        title: "Server Unavailable",
        info: "The server is not accepting requests at the moment. Try again later.",
    }),
    (StatusCode::CGI_ERROR, ErrorInfo {
        icon: '\u{1f4a5}',
        title: "CGI Error",
        info: "A program on the server failed while handling the request.",
    }),
    (StatusCode::PROXY_ERROR, ErrorInfo {
        icon: '\u{1f310}',
        title: "Proxy Error",
        info: "A proxy request failed because the server was unable to complete a transaction with the remote host.",
    }),
    (StatusCode::SLOW_DOWN, ErrorInfo {
        icon: '\u{1f40c}',
        title: "Slow Down",
        info: "The server is rate limiting requests.",
    }),
    (StatusCode::PERMANENT_FAILURE, ErrorInfo {
        icon: '\u{1f6ab}',
        title: "Permanent Failure",
        info: "The request failed and will fail again if repeated.",
    }),
    (StatusCode::NOT_FOUND, ErrorInfo {
        icon: '\u{1f50d}',
        title: "Not Found",
        info: "The requested resource does not exist at this location.",
    }),
    (StatusCode::GONE, ErrorInfo {
        icon: '\u{1f47b}',
        title: "Gone",
        info: "The requested resource is no longer available.",
    }),
    (StatusCode::PROXY_REQUEST_REFUSED, ErrorInfo {
        icon: '\u{1f6c2}',
        title: "Proxy Request Refused",
        info: "The server refused to act as a proxy for the requested host.",
    }),
    (StatusCode::BAD_REQUEST, ErrorInfo {
        icon: '\u{1f44e}',
        title: "Bad Request",
        info: "The server did not understand the request.",
    }),
    (StatusCode::CLIENT_CERTIFICATE_REQUIRED, ErrorInfo {
        icon: '\u{1f511}',
        title: "Certificate Required",
        info: "Access to the requested resource requires a client certificate.",
    }),
    (StatusCode::CERTIFICATE_NOT_AUTHORIZED, ErrorInfo {
        icon: '\u{1f512}',
        title: "Certificate Not Authorized",
        info: "The provided client certificate is valid but is not authorized for this resource.",
    }),
    (StatusCode::CERTIFICATE_NOT_VALID, ErrorInfo {
        icon: '\u{1f6a8}',
        title: "Invalid Certificate",
        info: "The provided client certificate is expired or invalid.",
    }),
];

/// Look up the presentation of an error code.
pub fn error_info(code: StatusCode) -> Option<&'static ErrorInfo> {
    ERRORS.iter().find(|(c, _)| *c == code).map(|(_, info)| info)
}

/// Longest meta string accepted in a response header.
pub const MAX_META_LEN: usize = 1024;

/// Parse a response header line (without the trailing CRLF).
///
/// The format is two digits, optionally followed by a space and the meta
/// string. Returns `None` for anything else.
pub fn parse_header(line: &[u8]) -> Option<(StatusCode, String)> {
    let line = std::str::from_utf8(line).ok()?;
    let bytes = line.as_bytes();
    if bytes.len() < 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return None;
    }
    let code: i16 = line[..2].parse().ok()?;
    let meta = match &line[2..] {
        "" => "",
        rest => rest.strip_prefix(' ')?,
    };
    if meta.len() > MAX_META_LEN {
        return None;
    }
    Some((StatusCode(code), meta.trim().to_string()))
}

/// Build a Gemini request (the URL terminated by CRLF).
pub fn build_request(url: &str) -> Vec<u8> {
    format!("{url}\r\n").into_bytes()
}
