//! Request lifecycle: fetching, response classification, redirects, input
//! prompts, the navigation cache and inline media requests.

use std::sync::Arc;

use gemview_net::status::error_info;
use gemview_net::url::percent_encode;
use gemview_net::{CertFlags, FetchSession, RequestId, RequestListener, Response, StatusCode, Url};

use super::{CertInfo, DocumentWidget, RequestState};
use crate::classify::{Disposition, RedirectDecision, classify, error_page};
use crate::decode::{Decoded, SELF_MEDIA_LINK, decode};
use crate::events::{DocumentEvent, Notifier, NotifyTarget};
use crate::layout::{Format, LinkFlags, LinkId, RunFlags};
use crate::media::MediaFlags;

/// An in-flight request for the inline media of a link.
pub(super) struct MediaRequest {
    pub link: LinkId,
    pub url: String,
    pub session: Box<dyn FetchSession>,
    pub notifier: Arc<Notifier>,
}

impl DocumentWidget {
    // -------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------

    /// Navigate to `url`, adding it to the history.
    pub fn open(&mut self, url: &str) {
        let url = url.trim();
        self.history.add_url(url);
        self.redirect_count = 0;
        self.set_url(url, false);
    }

    /// Show `url`. With `from_cache` a cached response is shown instead of
    /// fetching when the history has one.
    pub(super) fn set_url(&mut self, url: &str, from_cache: bool) {
        let url = url.split('#').next().unwrap_or(url);
        self.url_changed = url != self.url;
        self.url = url.to_string();
        self.cancel_media_requests();
        self.parse_user();
        self.init_norm_scroll_y = if from_cache {
            self.history
                .current()
                .filter(|r| r.url.eq_ignore_ascii_case(url))
                .map_or(0.0, |r| r.norm_scroll_y)
        } else {
            0.0
        };
        if from_cache && self.replay_cached() {
            return;
        }
        self.fetch();
    }

    /// Show the response cached in the history for the current URL.
    fn replay_cached(&mut self) -> bool {
        let Some(resp) = self.history.cached_response(&self.url).cloned() else {
            return false;
        };
        log::debug!("session {}: showing cached {}", self.session.0, self.url);
        self.cancel_request();
        self.doc.reset();
        self.doc.set_url(&self.url);
        self.doc.set_site_banner_enabled(true);
        self.wide.reset();
        self.state = RequestState::Fetching;
        self.cert = CertInfo::from_response(&resp);
        self.source_time = Some(resp.when);
        self.source_status = StatusCode::SUCCESS;
        self.source_content = resp.body.clone();
        self.update_theme();
        self.update_document(&resp, true, true);
        self.state = RequestState::Ready;
        let now = self.now();
        self.update_scroll_extent();
        self.scroll
            .init((self.init_norm_scroll_y * self.doc.size().y as f32) as i32);
        self.scroll.clamp(now);
        self.update_side_opacity(false);
        self.update_visible();
        self.update_outline();
        self.invalidate();
        let url = self.url.clone();
        self.emit(DocumentEvent::Changed { url });
        true
    }

    /// Start a fresh request for the current URL.
    fn fetch(&mut self) {
        self.cancel_request();
        log::info!("session {}: fetching {}", self.session.0, self.url);
        let url = self.url.clone();
        self.emit(DocumentEvent::RequestStarted { url: url.clone() });
        self.cancel_media_requests();
        self.cert = CertInfo::default();
        self.link_keys = None;
        self.state = RequestState::Fetching;
        self.input_prompted = false;
        let notifier = Notifier::new(
            self.session,
            NotifyTarget::Document,
            self.services.notify.clone(),
        );
        let listener = Arc::clone(&notifier) as Arc<dyn RequestListener>;
        let mut session = self.services.fetcher.fetch(&url, listener);
        session.submit();
        self.request = Some(session);
        self.notifier = Some(notifier);
    }

    fn cancel_request(&mut self) {
        if let Some(mut req) = self.request.take() {
            req.cancel();
        }
        if let Some(notifier) = self.notifier.take() {
            notifier.clear_pending();
        }
    }

    pub(super) fn is_current_request(&self, id: RequestId) -> bool {
        self.request.as_ref().is_some_and(|r| r.id() == id)
    }

    /// Copy of the current response. `None` until a header has arrived.
    fn snapshot(&self) -> Option<Response> {
        let req = self.request.as_ref()?;
        let resp = req.lock_response();
        (resp.status != StatusCode::NONE).then(|| resp.clone())
    }

    /// Cancel the request. A page that never finished loading is replaced
    /// by the previous one.
    pub fn stop(&mut self) {
        if self.request.is_none() {
            return;
        }
        log::info!("session {}: request cancelled", self.session.0);
        self.cancel_request();
        let url = self.url.clone();
        self.emit(DocumentEvent::RequestCancelled { url });
        if self.state != RequestState::Ready && !self.navigate_back() {
            self.state = RequestState::Ready;
            self.update_visible();
            self.needs_redraw = true;
        }
    }

    /// Fetch the current URL again, keeping the scroll position.
    pub fn reload(&mut self) {
        if self.request.is_some() || self.url.is_empty() {
            return;
        }
        self.init_norm_scroll_y = self.scroll.norm_pos(self.now());
        self.url_changed = false;
        self.fetch();
    }

    pub fn navigate_back(&mut self) -> bool {
        let Some(url) = self.history.go_back().map(|r| r.url.clone()) else {
            return false;
        };
        self.redirect_count = 0;
        self.set_url(&url, true);
        true
    }

    pub fn navigate_forward(&mut self) -> bool {
        let Some(url) = self.history.go_forward().map(|r| r.url.clone()) else {
            return false;
        };
        self.redirect_count = 0;
        self.set_url(&url, true);
        true
    }

    pub fn navigate_parent(&mut self) {
        if let Some(url) = Url::parse(&self.url) {
            self.open(&url.parent().to_string());
        }
    }

    pub fn navigate_root(&mut self) {
        if let Some(url) = Url::parse(&self.url) {
            self.open(&url.root().to_string());
        }
    }

    // -------------------------------------------------------------------
    // Input prompts
    // -------------------------------------------------------------------

    /// Answer the input prompt: the value becomes the query of the URL.
    pub fn submit_input(&mut self, value: &str) {
        let Some(url) = Url::parse(&self.url) else {
            return;
        };
        let target = url.with_query(Some(&percent_encode(value))).to_string();
        self.open(&target);
    }

    /// Dismiss the input prompt.
    pub fn cancel_input(&mut self) {
        if self.state == RequestState::Ready {
            return;
        }
        self.cancel_request();
        if !self.navigate_back() {
            self.state = RequestState::Ready;
            self.needs_redraw = true;
        }
    }

    // -------------------------------------------------------------------
    // Responses
    // -------------------------------------------------------------------

    pub(super) fn on_response_updated(&mut self) {
        let Some(resp) = self.snapshot() else {
            return;
        };
        let id = self.request.as_ref().map(|r| r.id());
        self.check_response(&resp);
        if id.is_some_and(|id| self.is_current_request(id)) {
            let url = self.url.clone();
            self.emit(DocumentEvent::RequestUpdated { url });
        }
    }

    pub(super) fn on_response_finished(&mut self) {
        let Some(req) = self.request.as_ref() else {
            return;
        };
        let id = req.id();
        let resp = req.lock_response().clone();
        if resp.status != StatusCode::NONE {
            self.check_response(&resp);
        }
        if !self.is_current_request(id) {
            // A redirect replaced the request.
            return;
        }
        self.source_content = resp.body.clone();
        let url = self.url.clone();
        if self.state == RequestState::Fetching && self.input_prompted {
            self.request = None;
            self.notifier = None;
            self.emit(DocumentEvent::RequestFinished { url });
            return;
        }
        if resp.status == StatusCode::NONE {
            // Closed without a header.
            self.show_error_page(StatusCode::INVALID_HEADER, "");
        }
        if resp.status.is_success() {
            self.update_document(&resp, true, false);
        }
        self.source_time = Some(resp.when);
        self.state = RequestState::Ready;
        if !self.url.starts_with("about:")
            && resp.status.is_success()
            && resp.meta.trim_start().starts_with("text/")
        {
            self.history.set_cached_response(&resp);
        }
        self.request = None;
        self.notifier = None;
        if self.init_norm_scroll_y > 0.0 {
            let now = self.now();
            self.update_scroll_extent();
            self.scroll
                .init((self.init_norm_scroll_y * self.doc.size().y as f32) as i32);
            self.scroll.clamp(now);
            self.init_norm_scroll_y = 0.0;
        }
        self.update_visible();
        self.update_outline();
        self.needs_redraw = true;
        log::info!(
            "session {}: {} finished with {} ({} bytes)",
            self.session.0,
            url,
            resp.status.0,
            resp.body.len()
        );
        self.emit(DocumentEvent::RequestFinished { url: url.clone() });
        self.emit(DocumentEvent::Changed { url });
    }

    /// React to the response as far as it has arrived.
    fn check_response(&mut self, resp: &Response) {
        match self.state {
            RequestState::Fetching => {},
            RequestState::ReceivedPartial => {
                if resp.status.is_success() {
                    self.update_document(resp, false, false);
                }
                return;
            },
            RequestState::Blank | RequestState::Ready => return,
        }
        let disposition = match Url::parse(&self.url) {
            Some(url) => classify(resp, &url, self.redirect_count, self.config.max_redirects),
            None => Disposition::Error(resp.status.display_error()),
        };
        match disposition {
            Disposition::Input { sensitive, prompt } => {
                if !self.input_prompted {
                    self.input_prompted = true;
                    let url = self.url.clone();
                    self.emit(DocumentEvent::InputRequested {
                        url,
                        prompt,
                        sensitive,
                    });
                }
            },
            Disposition::Content => {
                self.begin_response(resp);
                self.update_document(resp, false, true);
            },
            Disposition::Redirect(decision) => match decision {
                RedirectDecision::Invalid => {
                    self.show_error_page(StatusCode::INVALID_REDIRECT, "");
                },
                RedirectDecision::TooMany(dst) => {
                    self.show_error_page(StatusCode::TOO_MANY_REDIRECTS, &dst);
                },
                RedirectDecision::NeedsApproval(dst) => {
                    self.show_error_page(StatusCode::SCHEME_CHANGE_REDIRECT, &dst);
                },
                RedirectDecision::Follow(dst) => {
                    log::info!("session {}: redirected to {dst}", self.session.0);
                    self.redirect_count += 1;
                    if let Some(recent) = self.history.most_recent_mut() {
                        recent.url = dst.clone();
                    }
                    self.set_url(&dst, false);
                },
            },
            Disposition::Error(code) => {
                self.cert = CertInfo::from_response(resp);
                self.show_error_page(code, &resp.meta);
            },
        }
    }

    /// Start showing a success response.
    fn begin_response(&mut self, resp: &Response) {
        self.state = RequestState::ReceivedPartial;
        self.cert = CertInfo::from_response(resp);
        self.source_status = resp.status;
        self.side_opacity.init(0.0);
        if self.url_changed {
            self.scroll.init(0);
        }
        self.doc.reset();
        self.doc.set_url(&self.url);
        self.doc.set_site_banner_enabled(true);
        self.wide.reset();
        self.update_theme();
    }

    /// Replace the document with the page for error `code`.
    fn show_error_page(&mut self, code: StatusCode, meta: &str) {
        log::warn!("session {}: {} gave error {}", self.session.0, self.url, code.0);
        let page = error_page(code, meta);
        self.source_status = code;
        self.doc.reset();
        self.doc.set_url(&self.url);
        self.doc.set_site_banner_enabled(page.banner);
        self.doc.set_format(Format::Gemini);
        self.wide.reset();
        self.update_theme();
        self.scroll.init(0);
        self.side_opacity.init(0.0);
        self.state = RequestState::Ready;
        self.set_source(&page.source);
    }

    /// Typeset the response body as far as it has arrived.
    fn update_document(&mut self, resp: &Response, is_final: bool, is_initial: bool) {
        if self.state == RequestState::Ready || !resp.status.is_success() {
            return;
        }
        match decode(&resp.meta, &resp.body, &self.url, is_final, is_initial) {
            Decoded::Unsupported => {
                self.source_mime = resp.meta.clone();
                self.show_error_page(StatusCode::UNSUPPORTED_MIME_TYPE, &resp.meta);
            },
            Decoded::AudioRefresh { mime, flags } => {
                self.doc
                    .media_mut()
                    .set_data(SELF_MEDIA_LINK, Some(&mime), &resp.body, flags);
                self.needs_redraw = true;
                self.invalidate_visible_players();
            },
            Decoded::Source {
                format,
                source,
                mime,
                media,
            } => {
                self.doc.set_format(format);
                if let Some(flags) = media {
                    self.doc
                        .media_mut()
                        .set_data(SELF_MEDIA_LINK, Some(&mime), &resp.body, flags);
                }
                self.source_mime = mime;
                self.set_source(&source);
            },
        }
    }

    fn invalidate_visible_players(&mut self) {
        let keys = self.visible.players.clone();
        self.mark_dirty(keys);
    }

    // -------------------------------------------------------------------
    // Certificates
    // -------------------------------------------------------------------

    /// Pin the server certificate of the current page and reload it.
    pub fn trust_certificate(&mut self) -> bool {
        if !self.cert.can_trust() || self.cert.flags.contains(CertFlags::TRUSTED) {
            return false;
        }
        let Some(url) = Url::parse(&self.url) else {
            return false;
        };
        log::info!("session {}: trusting certificate of {}", self.session.0, url.host);
        self.services
            .certs
            .set_trusted(&url.host, &self.cert.fingerprint, self.cert.valid_until);
        self.cert.flags |= CertFlags::TRUSTED;
        self.reload();
        true
    }

    /// Human-readable summary of the server certificate.
    pub fn certificate_summary(&self) -> String {
        let cert = &self.cert;
        if !cert.flags.contains(CertFlags::AVAILABLE) {
            return "No certificate".to_string();
        }
        let check = |flag: CertFlags| if cert.flags.contains(flag) { "yes" } else { "no" };
        let fingerprint: String = cert.fingerprint.iter().map(|b| format!("{b:02x}")).collect();
        let expiry = cert
            .valid_until
            .map_or_else(|| "unknown".to_string(), |t| t.format("%Y-%m-%d").to_string());
        format!(
            "Subject: {}\nExpires: {expiry}\nDomain verified: {}\nNot expired: {}\nTrusted: {}\nFingerprint: {fingerprint}",
            cert.subject,
            check(CertFlags::DOMAIN_VERIFIED),
            check(CertFlags::TIME_VERIFIED),
            check(CertFlags::TRUSTED),
        )
    }

    // -------------------------------------------------------------------
    // Inline media
    // -------------------------------------------------------------------

    pub(super) fn media_request_index(&self, link: LinkId) -> Option<usize> {
        self.media_requests.iter().position(|r| r.link == link)
    }

    /// Start downloading the inline content of `link`. Returns false if a
    /// request already exists or the link is unknown.
    pub(super) fn request_media(&mut self, link: LinkId) -> bool {
        if self.media_request_index(link).is_some() {
            return false;
        }
        let Some(url) = self.doc.link(link).map(|l| l.url.clone()) else {
            return false;
        };
        log::debug!("session {}: requesting media {url}", self.session.0);
        let notifier = Notifier::new(
            self.session,
            NotifyTarget::Media(link),
            self.services.notify.clone(),
        );
        let listener = Arc::clone(&notifier) as Arc<dyn RequestListener>;
        let mut session = self.services.fetcher.fetch(&url, listener);
        session.submit();
        self.media_requests.push(MediaRequest {
            link,
            url,
            session,
            notifier,
        });
        self.invalidate_link(link);
        true
    }

    pub(super) fn cancel_media_requests(&mut self) {
        for mut req in self.media_requests.drain(..) {
            req.session.cancel();
        }
    }

    /// Body size of the media request for `link`, while it is running.
    pub(super) fn media_progress(&self, link: LinkId) -> Option<usize> {
        let req = &self.media_requests[self.media_request_index(link)?];
        (!req.session.is_finished()).then(|| req.session.body_size())
    }

    pub(super) fn on_media_updated(&mut self, link: LinkId, id: RequestId) -> bool {
        let Some(index) = self.media_request_index(link) else {
            return false;
        };
        let req = &self.media_requests[index];
        if req.session.id() != id {
            return false;
        }
        req.notifier.clear_pending();
        let resp = req.session.lock_response().clone();
        if resp.status.is_success() && resp.meta.starts_with("audio/") {
            let is_new = self.doc.media().find_audio(link).is_none();
            let mime = resp.meta.split(';').next().unwrap_or("").trim().to_string();
            self.doc.media_mut().set_data(
                link,
                Some(&mime),
                &resp.body,
                MediaFlags::PARTIAL_DATA | MediaFlags::ALLOW_HIDE,
            );
            if is_new {
                self.doc.redo_layout();
                self.runs_invalidated();
                self.update_visible();
                self.invalidate();
            }
        }
        self.invalidate_link(link);
        true
    }

    pub(super) fn on_media_finished(&mut self, link: LinkId, id: RequestId) -> bool {
        let Some(index) = self.media_request_index(link) else {
            return false;
        };
        if self.media_requests[index].session.id() != id {
            return false;
        }
        let resp = self.media_requests[index].session.lock_response().clone();
        let mime = resp.meta.split(';').next().unwrap_or("").trim().to_string();
        let is_media = mime.starts_with("image/") || mime.starts_with("audio/");
        if resp.status.is_success() && is_media {
            log::debug!(
                "session {}: media for link {link} done ({} bytes)",
                self.session.0,
                resp.body.len()
            );
            self.doc
                .media_mut()
                .set_data(link, Some(&mime), &resp.body, MediaFlags::ALLOW_HIDE);
            self.doc.redo_layout();
            self.runs_invalidated();
            self.update_visible();
            self.invalidate();
        } else {
            let code = if resp.status.is_success() {
                StatusCode::UNSUPPORTED_MIME_TYPE
            } else {
                resp.status.display_error()
            };
            let message = match error_info(code) {
                Some(info) => format!("{}\n{}", info.title, info.info),
                None => format!("Error {}", resp.status.0),
            };
            log::warn!("session {}: media for link {link} failed: {}", self.session.0, resp.status.0);
            self.media_requests.remove(index);
            self.emit(DocumentEvent::Message(message));
            self.invalidate_link(link);
        }
        true
    }

    /// Start fetching the first visible image link that has not been
    /// fetched yet.
    pub(super) fn fetch_next_unfetched_image(&mut self) -> bool {
        let candidate = self
            .visible
            .links
            .iter()
            .filter_map(|&k| self.doc.run(k))
            .filter(|r| !r.is_decoration() && r.image_id.is_none())
            .filter(|r| !r.flags.contains(RunFlags::SITE_BANNER))
            .filter_map(|r| r.link_id)
            .find(|&id| {
                self.doc.link(id).is_some_and(|l| {
                    l.flags.contains(LinkFlags::IMAGE_FILE_EXTENSION)
                        && !l.flags.contains(LinkFlags::CONTENT)
                }) && self.media_request_index(id).is_none()
            });
        match candidate {
            Some(id) => self.request_media(id),
            None => false,
        }
    }

    /// Show or hide the inline content of a media link.
    pub(super) fn toggle_media(&mut self, link: LinkId) {
        if self.doc.media().is_permanent(link) {
            return;
        }
        if self.doc.media().has_content(link) {
            // Hide the content, keeping the downloaded data.
            self.doc.media_mut().set_data(link, None, &[], MediaFlags::empty());
            self.doc.redo_layout();
            self.runs_invalidated();
            self.update_visible();
            self.invalidate();
            return;
        }
        match self.media_request_index(link) {
            None => {
                self.request_media(link);
            },
            Some(index) => {
                let req = &self.media_requests[index];
                if !req.session.is_finished() {
                    return;
                }
                let resp = req.session.lock_response().clone();
                if resp.status.is_success() {
                    let mime = resp.meta.split(';').next().unwrap_or("").trim().to_string();
                    self.doc
                        .media_mut()
                        .set_data(link, Some(&mime), &resp.body, MediaFlags::ALLOW_HIDE);
                    self.doc.redo_layout();
                    self.runs_invalidated();
                    self.update_visible();
                    self.invalidate();
                }
            },
        }
    }
}
