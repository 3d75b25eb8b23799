//! Response classification and synthesized status pages.
//!
//! The first update of a response decides what the document becomes: an
//! input prompt, decoded content, a redirect, or an error page. Error pages
//! are ordinary gemtext so they go through the same layout path as content.

use gemview_net::status::error_info;
use gemview_net::{Category, Response, StatusCode, Url};

/// Drawn when an error code has no icon of its own.
const FALLBACK_ERROR_ICON: char = '\u{2327}';

/// Shortcut mentioned on the unsupported content page.
pub const SAVE_SHORTCUT: &str = "Ctrl+S";

/// What to do with a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// The target was empty or unparseable.
    Invalid,
    /// The redirect limit was reached. Holds the resolved target.
    TooMany(String),
    /// Same scheme: follow without asking.
    Follow(String),
    /// The scheme changes: show the target and let the user decide.
    NeedsApproval(String),
}

/// Outcome of the first look at a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Input { sensitive: bool, prompt: String },
    Content,
    Redirect(RedirectDecision),
    Error(StatusCode),
}

/// Classify `response` received for `url`.
///
/// `redirect_count` is how many redirects led to this request.
pub fn classify(response: &Response, url: &Url, redirect_count: u8, max_redirects: u8) -> Disposition {
    match response.status.category() {
        Category::Input => Disposition::Input {
            sensitive: response.status == StatusCode::SENSITIVE_INPUT,
            prompt: input_prompt(&response.meta, url),
        },
        Category::Success => Disposition::Content,
        Category::Redirect => Disposition::Redirect(decide_redirect(
            &response.meta,
            url,
            redirect_count,
            max_redirects,
        )),
        _ => Disposition::Error(response.status.display_error()),
    }
}

fn input_prompt(meta: &str, url: &Url) -> String {
    if meta.trim().is_empty() {
        format!("Please enter input for {}:", url.path)
    } else {
        meta.to_string()
    }
}

/// Apply the redirect policy. Only the scheme is compared: a same-scheme
/// redirect to another host is followed automatically.
pub fn decide_redirect(meta: &str, url: &Url, redirect_count: u8, max_redirects: u8) -> RedirectDecision {
    let meta = meta.trim();
    if meta.is_empty() {
        return RedirectDecision::Invalid;
    }
    let Some(dst) = url.resolve(meta) else {
        return RedirectDecision::Invalid;
    };
    if redirect_count >= max_redirects {
        return RedirectDecision::TooMany(dst.to_string());
    }
    if dst.scheme.eq_ignore_ascii_case(&url.scheme) {
        RedirectDecision::Follow(dst.to_string())
    } else {
        RedirectDecision::NeedsApproval(dst.to_string())
    }
}

/// Gemtext of a synthesized error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub source: String,
    /// Whether the site banner is shown above the message.
    pub banner: bool,
}

/// Build the page shown for `code`. `meta` carries the redirect target,
/// TLS error, MIME type, or wait time depending on the code.
pub fn error_page(code: StatusCode, meta: &str) -> ErrorPage {
    let (icon, title, info) = match error_info(code) {
        Some(e) => (e.icon, e.title, e.info),
        None => (FALLBACK_ERROR_ICON, "Unknown Error", ""),
    };
    let mut source = format!("# {icon} {title}\n{info}");
    let mut banner = true;
    if !meta.is_empty() {
        match code {
            StatusCode::SCHEME_CHANGE_REDIRECT | StatusCode::TOO_MANY_REDIRECTS => {
                source.push_str(&format!("\n=> {meta}\n"));
            },
            StatusCode::TLS_FAILURE => {
                banner = false;
                source.push_str(&format!("\n\n>{meta}\n"));
            },
            StatusCode::FAILED_TO_OPEN_FILE | StatusCode::CERTIFICATE_NOT_VALID => {
                source.push_str(&format!("\n\n{meta}"));
            },
            StatusCode::UNSUPPORTED_MIME_TYPE => {
                source.push_str(&format!(
                    "\n```\n{meta}\n```\nYou can save it as a file to your Downloads folder, \
                     though. Press {SAVE_SHORTCUT} or select \"Save to Downloads\" from the menu."
                ));
            },
            StatusCode::SLOW_DOWN => {
                source.push_str(&format!("\n\nWait {meta} seconds before your next request."));
            },
            _ => {},
        }
    }
    ErrorPage { source, banner }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn success_is_content() {
        let r = Response::new(StatusCode::SUCCESS, "text/gemini");
        assert_eq!(classify(&r, &url("gemini://a/"), 0, 5), Disposition::Content);
    }

    #[test]
    fn input_prompt_defaults_to_path() {
        let r = Response::new(StatusCode::SENSITIVE_INPUT, "");
        assert_eq!(classify(&r, &url("gemini://a/search"), 0, 5), Disposition::Input {
            sensitive: true,
            prompt: "Please enter input for /search:".into(),
        });
        let r = Response::new(StatusCode::INPUT, "Your name?");
        match classify(&r, &url("gemini://a/"), 0, 5) {
            Disposition::Input { sensitive, prompt } => {
                assert!(!sensitive);
                assert_eq!(prompt, "Your name?");
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_redirect_is_invalid() {
        let r = Response::new(StatusCode::REDIRECT_TEMPORARY, "  ");
        assert_eq!(
            classify(&r, &url("gemini://a/"), 2, 5),
            Disposition::Redirect(RedirectDecision::Invalid)
        );
    }

    #[test]
    fn same_scheme_followed_even_across_hosts() {
        let d = decide_redirect("gemini://other.host/x", &url("gemini://a/"), 0, 5);
        assert_eq!(d, RedirectDecision::Follow("gemini://other.host/x".into()));
        let d = decide_redirect("/moved", &url("GEMINI://a/old"), 0, 5);
        assert_eq!(d, RedirectDecision::Follow("gemini://a/moved".into()));
    }

    #[test]
    fn scheme_change_needs_approval() {
        let d = decide_redirect("https://a/", &url("gemini://a/"), 0, 5);
        assert_eq!(d, RedirectDecision::NeedsApproval("https://a/".into()));
    }

    #[test]
    fn undefined_codes_fall_back_by_category() {
        let r = Response::new(StatusCode(47), "");
        assert_eq!(
            classify(&r, &url("gemini://a/"), 0, 5),
            Disposition::Error(StatusCode::TEMPORARY_FAILURE)
        );
        let r = Response::new(StatusCode(58), "");
        assert_eq!(
            classify(&r, &url("gemini://a/"), 0, 5),
            Disposition::Error(StatusCode::PERMANENT_FAILURE)
        );
        let r = Response::new(StatusCode(91), "");
        assert_eq!(
            classify(&r, &url("gemini://a/"), 0, 5),
            Disposition::Error(StatusCode::UNKNOWN_STATUS_CODE)
        );
    }

    #[test]
    fn error_page_texts() {
        let page = error_page(StatusCode::SLOW_DOWN, "30");
        assert!(page.source.starts_with("# "));
        assert!(page.source.ends_with("Wait 30 seconds before your next request."));
        assert!(page.banner);

        let page = error_page(StatusCode::TLS_FAILURE, "handshake failed");
        assert!(!page.banner);
        assert!(page.source.ends_with("\n\n>handshake failed\n"));

        let page = error_page(StatusCode::UNSUPPORTED_MIME_TYPE, "application/zip");
        assert!(page.source.contains("\n```\napplication/zip\n```\n"));
        assert!(page.source.contains(SAVE_SHORTCUT));

        let page = error_page(StatusCode::TOO_MANY_REDIRECTS, "gemini://x/");
        assert!(page.source.ends_with("\n=> gemini://x/\n"));
    }

    #[test]
    fn tls_page_keeps_banner_without_meta() {
        assert!(error_page(StatusCode::TLS_FAILURE, "").banner);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn redirect_limit_independent_of_target(
                count in 5u8..=255,
                path in "[a-z]{1,8}",
                scheme in proptest::sample::select(vec!["gemini", "https", "gopher"]),
            ) {
                let target = format!("{scheme}://h/{path}");
                let d = decide_redirect(&target, &url("gemini://a/"), count, 5);
                prop_assert!(matches!(d, RedirectDecision::TooMany(_)));
            }

            #[test]
            fn below_limit_policy_is_scheme_only(count in 0u8..5, host in "[a-z]{1,8}") {
                let same = decide_redirect(&format!("gemini://{host}/"), &url("gemini://a/"), count, 5);
                prop_assert!(matches!(same, RedirectDecision::Follow(_)));
                let other = decide_redirect(&format!("http://{host}/"), &url("gemini://a/"), count, 5);
                prop_assert!(matches!(other, RedirectDecision::NeedsApproval(_)));
            }
        }
    }
}
