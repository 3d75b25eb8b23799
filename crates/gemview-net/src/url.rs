//! URL parsing and resolution (simplified RFC 3986).

use std::fmt;

/// A parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Scheme component, lowercased (e.g. `"gemini"`, `"file"`, `"about"`).
    pub scheme: String,
    /// Host component. Empty for `file:///` and opaque URLs.
    pub host: String,
    /// Optional explicit port number.
    pub port: Option<u16>,
    /// Path component. Starts with `/` for hierarchical URLs; for opaque
    /// URLs such as `about:blank` it is everything after the colon.
    pub path: String,
    /// Optional query string (without the leading `?`).
    pub query: Option<String>,
    /// Optional fragment (without the leading `#`).
    pub fragment: Option<String>,
    /// Whether the URL was written with `//` after the scheme.
    pub hierarchical: bool,
}

impl Url {
    /// Parse an absolute URL.
    ///
    /// Handles hierarchical URLs (`gemini://host/path`, `file:///path`)
    /// and opaque ones (`about:blank`, `mailto:a@b`).
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        if let Some(idx) = url.find("://") {
            let scheme = &url[..idx];
            if !is_scheme(scheme) {
                return None;
            }
            return Some(Self::parse_authority_and_path(scheme, &url[idx + 3..]));
        }
        let idx = url.find(':')?;
        let scheme = &url[..idx];
        if !is_scheme(scheme) {
            return None;
        }
        let (rest, query, fragment) = split_path_query_fragment(&url[idx + 1..]);
        Some(Url {
            scheme: scheme.to_lowercase(),
            host: String::new(),
            port: None,
            path: rest,
            query,
            fragment,
            hierarchical: false,
        })
    }

    fn parse_authority_and_path(scheme: &str, rest: &str) -> Url {
        let (rest, fragment) = match rest.find('#') {
            Some(i) => (&rest[..i], Some(rest[i + 1..].to_string())),
            None => (rest, None),
        };
        let (rest, query) = match rest.find('?') {
            Some(i) => (&rest[..i], Some(rest[i + 1..].to_string())),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rfind(':') {
            Some(i) => match authority[i + 1..].parse::<u16>() {
                Ok(p) => (&authority[..i], Some(p)),
                Err(_) => (authority, None),
            },
            None => (authority, None),
        };
        Url {
            scheme: scheme.to_lowercase(),
            host: host.to_lowercase(),
            port,
            path: if path.is_empty() { "/".into() } else { path.into() },
            query,
            fragment,
            hierarchical: true,
        }
    }

    /// Resolve a reference against this base URL.
    pub fn resolve(&self, relative: &str) -> Option<Url> {
        let relative = relative.trim();
        if relative.is_empty() {
            return Some(self.clone());
        }
        if let Some(abs) = Url::parse(relative) {
            return Some(abs);
        }
        if !self.hierarchical {
            return None;
        }
        if relative.starts_with("//") {
            return Url::parse(&format!("{}:{}", self.scheme, relative));
        }
        if let Some(frag) = relative.strip_prefix('#') {
            let mut resolved = self.clone();
            resolved.fragment = Some(frag.to_string());
            return Some(resolved);
        }
        if let Some(query) = relative.strip_prefix('?') {
            let mut resolved = self.clone();
            resolved.query = Some(query.to_string());
            resolved.fragment = None;
            return Some(resolved);
        }
        let (rel_path, query, fragment) = split_path_query_fragment(relative);
        let path = if rel_path.starts_with('/') {
            resolve_path("/", &rel_path)
        } else {
            resolve_path(self.directory(), &rel_path)
        };
        Some(Url {
            path,
            query,
            fragment,
            ..self.clone()
        })
    }

    /// File extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let filename = self.path.rsplit('/').next()?;
        let dot = filename.rfind('.')?;
        let ext = &filename[dot + 1..];
        if ext.is_empty() { None } else { Some(ext) }
    }

    /// Everything up to and including the last `/` of the path.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(i) => &self.path[..=i],
            None => "/",
        }
    }

    /// Last non-empty path segment, percent-decoded.
    pub fn last_path_segment(&self) -> Option<String> {
        self.path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .map(percent_decode)
    }

    /// `scheme://host[:port]`.
    pub fn origin(&self) -> String {
        let mut s = format!("{}://{}", self.scheme, self.host);
        if let Some(port) = self.port {
            s.push_str(&format!(":{port}"));
        }
        s
    }

    /// The same URL with its query replaced (and fragment dropped).
    pub fn with_query(&self, query: Option<&str>) -> Url {
        Url {
            query: query.map(str::to_string),
            fragment: None,
            ..self.clone()
        }
    }

    /// The parent directory: `/a/b/c` and `/a/b/c/` both become `/a/b/`.
    pub fn parent(&self) -> Url {
        let trimmed = self.path.strip_suffix('/').unwrap_or(&self.path);
        let path = match trimmed.rfind('/') {
            Some(i) => trimmed[..=i].to_string(),
            None => "/".to_string(),
        };
        Url {
            path,
            query: None,
            fragment: None,
            ..self.clone()
        }
    }

    /// The root of the host (`/`).
    pub fn root(&self) -> Url {
        Url {
            path: "/".into(),
            query: None,
            fragment: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hierarchical {
            write!(f, "{}://{}", self.scheme, self.host)?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
        } else {
            write!(f, "{}:", self.scheme)?;
        }
        write!(f, "{}", self.path)?;
        if let Some(ref q) = self.query {
            write!(f, "?{q}")?;
        }
        if let Some(ref frag) = self.fragment {
            write!(f, "#{frag}")?;
        }
        Ok(())
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn split_path_query_fragment(s: &str) -> (String, Option<String>, Option<String>) {
    let (s, fragment) = match s.find('#') {
        Some(i) => (&s[..i], Some(s[i + 1..].to_string())),
        None => (s, None),
    };
    let (path, query) = match s.find('?') {
        Some(i) => (s[..i].to_string(), Some(s[i + 1..].to_string())),
        None => (s.to_string(), None),
    };
    (path, query, fragment)
}

/// Resolve `relative` against `base_dir`, collapsing `.` and `..`.
fn resolve_path(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in relative.split('/') {
        match seg {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }
    let mut path = format!("/{}", segments.join("/"));
    if (relative.ends_with('/') || relative.ends_with("/.") || relative.ends_with("/.."))
        && !path.ends_with('/')
    {
        path.push('/');
    }
    path
}

// ---------------------------------------------------------------------------
// Percent encoding
// ---------------------------------------------------------------------------

/// Percent-encode everything except RFC 3986 unreserved characters.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim; invalid UTF-8
/// is replaced.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
