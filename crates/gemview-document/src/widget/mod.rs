//! The document widget.
//!
//! [`DocumentWidget`] shows one Gemini document. It drives the request for
//! the current URL, typesets the response, keeps the scroll position and
//! the visible-run sets current, paints through a [`Canvas`] and turns input
//! into navigation, selection and media control.
//!
//! Background work never touches the widget. Requests and the player timer
//! post [`Notification`]s to a channel and the host hands them back through
//! [`DocumentWidget::handle_notification`] on the UI thread.
//!
//! [`Canvas`]: crate::canvas::Canvas

mod actions;
mod draw;
mod input;
mod player_ui;
mod request;
mod view;

use std::ops::Range;
use std::sync::mpsc::Sender;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use gemview_net::certs::CertStore;
use gemview_net::{CertFlags, FetchSession, Response, StatusCode, Url};
use gemview_types::error::Result;
use gemview_types::geometry::{Int2, Rect};
use gemview_types::input::MouseButton;
use gemview_types::palette::FontId;
use gemview_ui::animation::Anim;
use gemview_ui::click::Click;
use gemview_ui::clock::Clock;
use gemview_ui::ticker::Ticker;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DocumentConfig;
use crate::events::{DocumentEvent, Notification, Notifier, SessionId};
use crate::fetch::Fetcher;
use crate::focus::FocusRegistry;
use crate::history::History;
use crate::layout::{
    DocumentLayout, GemDocument, LinkFlags, LinkId, MonospaceMeasurer, RunKey, TextMeasurer,
};
use crate::mark::Mark;
use crate::media::{MediaId, PlayerTimer};
use crate::ordinal::OrdinalMode;
use crate::scroll::{ScrollController, WideOffsets};
use crate::visbuf::{DirtyRuns, VisBuf};
use crate::visible::{VisibleSets, current_heading, visible_range};

use request::MediaRequest;

// -----------------------------------------------------------------------
// Public types
// -----------------------------------------------------------------------

/// Progress of the request for the current URL.
///
/// A widget starts out `Blank` and never returns there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestState {
    #[default]
    Blank,
    /// Waiting for the response header, or for the user to answer an
    /// input prompt.
    Fetching,
    /// The header is in and the body is still arriving.
    ReceivedPartial,
    /// Content or an error page is shown.
    Ready,
}

/// What the lock icon next to the URL shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustIndicator {
    /// No certificate (local files, `about:` pages, nothing loaded).
    Unavailable,
    DomainMismatch,
    Untrusted,
    Expired,
    Trusted,
}

/// Pointer shape the host should show over the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Arrow,
    Hand,
    IBeam,
}

/// Collaborators shared with the rest of the application.
#[derive(Clone)]
pub struct Services {
    pub fetcher: Arc<dyn Fetcher>,
    pub certs: Arc<dyn CertStore>,
    pub focus: FocusRegistry,
    pub clock: Arc<dyn Clock>,
    /// Where background work posts notifications for this widget.
    pub notify: Sender<Notification>,
}

/// A heading listed in the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    /// Source range of the heading text.
    pub text: Range<usize>,
    pub level: usize,
    pub font: FontId,
    /// Document-space bounds of the heading.
    pub bounds: Rect,
    /// Horizontal indent within the outline panel.
    pub indent: i32,
}

// -----------------------------------------------------------------------
// Internal state
// -----------------------------------------------------------------------

/// Certificate details of the current response.
#[derive(Debug, Clone, Default, PartialEq)]
struct CertInfo {
    flags: CertFlags,
    fingerprint: Vec<u8>,
    valid_until: Option<DateTime<Utc>>,
    subject: String,
}

impl CertInfo {
    fn from_response(resp: &Response) -> Self {
        Self {
            flags: resp.cert_flags,
            fingerprint: resp.cert_fingerprint.clone(),
            valid_until: resp.cert_valid_until,
            subject: resp.cert_subject.clone(),
        }
    }

    fn indicator(&self) -> TrustIndicator {
        if !self.flags.contains(CertFlags::AVAILABLE) {
            TrustIndicator::Unavailable
        } else if !self.flags.contains(CertFlags::DOMAIN_VERIFIED) {
            TrustIndicator::DomainMismatch
        } else if !self.flags.contains(CertFlags::TRUSTED) {
            TrustIndicator::Untrusted
        } else if !self.flags.contains(CertFlags::TIME_VERIFIED) {
            TrustIndicator::Expired
        } else {
            TrustIndicator::Trusted
        }
    }

    fn can_trust(&self) -> bool {
        self.flags.contains(
            CertFlags::AVAILABLE
                | CertFlags::HAVE_FINGERPRINT
                | CertFlags::TIME_VERIFIED
                | CertFlags::DOMAIN_VERIFIED,
        )
    }
}

/// Frame callbacks the widget can have registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Animation {
    /// Vertical scroll or a wide block is moving.
    Scroll,
    SideOpacity,
    OutlineOpacity,
}

/// Link-key mode: visible links are numbered and a key press opens one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkKeys {
    mode: OrdinalMode,
    /// End the mode when any key is released.
    release: bool,
}

/// Player whose volume slider is being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GrabbedPlayer {
    run: RunKey,
    id: MediaId,
    start_volume: f32,
}

/// Saved form of a session.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    url: String,
    history: History,
}

/// Idle time after which the volume slider hides itself.
const VOLUME_UI_IDLE_MS: u64 = 3000;

const SIDE_FADE_IN_MS: u32 = 200;
const SIDE_FADE_OUT_MS: u32 = 100;
const OUTLINE_FADE_IN_MS: u32 = 166;
const OUTLINE_FADE_OUT_MS: u32 = 333;

// -----------------------------------------------------------------------
// DocumentWidget
// -----------------------------------------------------------------------

/// Displays one Gemini document and everything needed to interact with it.
pub struct DocumentWidget {
    /// Identifies this widget in notifications and the focus registry.
    session: SessionId,

    pub config: DocumentConfig,

    services: Services,

    /// Typeset document.
    doc: Box<dyn DocumentLayout>,

    /// Measures text for overlays drawn outside the layout.
    measurer: Box<dyn TextMeasurer>,

    // -- Request --------------------------------------------------------
    url: String,

    /// User name found in the URL path (`~user`, `/users/user`).
    title_user: String,

    state: RequestState,

    history: History,

    /// In-flight request for `url`.
    request: Option<Box<dyn FetchSession>>,

    /// Listener of `request`.
    notifier: Option<Arc<Notifier>>,

    /// Requests for inline media, one per link.
    media_requests: Vec<MediaRequest>,

    /// Redirects followed to reach `url`.
    redirect_count: u8,

    /// An input prompt was emitted for the current request.
    input_prompted: bool,

    /// The URL changed since the last response; scroll starts from the top.
    url_changed: bool,

    /// Scroll position to restore once the response is complete.
    init_norm_scroll_y: f32,

    source_mime: String,
    source_content: Vec<u8>,
    source_time: Option<DateTime<Utc>>,
    source_status: StatusCode,

    cert: CertInfo,

    // -- View -----------------------------------------------------------
    /// Widget rectangle in window coordinates.
    bounds: Rect,

    /// Whether the widget is on screen.
    visible_on_screen: bool,

    scroll: ScrollController,

    wide: WideOffsets,

    /// Runs of the wide block being animated.
    wide_anim_runs: Vec<RunKey>,

    visible: VisibleSets,

    /// Level-one heading the reader is under.
    current_heading: Option<Range<usize>>,

    /// Times the side icon was regenerated.
    side_icon_updates: u32,

    side_opacity: Anim,

    outline: Vec<OutlineItem>,

    outline_opacity: Anim,

    /// Scrollbar thumb in window coordinates.
    scrollbar_thumb: Option<Rect>,

    /// Short documents are centered vertically.
    center_vertically: bool,

    ticker: Ticker<Animation>,

    player_timer: Option<PlayerTimer>,

    visbuf: VisBuf,

    /// Runs to repaint in place on the next draw.
    dirty: DirtyRuns,

    /// Something changed since the last draw.
    needs_redraw: bool,

    // -- Interaction ----------------------------------------------------
    hover_link: Option<LinkId>,

    /// Last known pointer position.
    hover_pos: Int2,

    /// Link under the pointer when the context menu was opened.
    context_link: Option<LinkId>,

    /// Hover is suspended while an animated scroll runs.
    no_hover_while_scrolling: bool,

    /// A drag selection is in progress.
    selecting: bool,

    select_mark: Option<Mark>,

    found_mark: Option<Mark>,

    click: Click,

    grabbed_player: Option<GrabbedPlayer>,

    link_keys: Option<LinkKeys>,

    cursor: CursorShape,

    /// Events waiting for the host.
    events: Vec<DocumentEvent>,
}

impl DocumentWidget {
    /// Create a widget with the built-in typesetter.
    pub fn new(config: DocumentConfig, services: Services) -> Self {
        let measurer = MonospaceMeasurer::default();
        Self::with_layout(
            config,
            services,
            Box::new(GemDocument::new(measurer)),
            Box::new(measurer),
        )
    }

    /// Create a widget around a custom layout. `measurer` must measure
    /// text the same way the layout does.
    pub fn with_layout(
        config: DocumentConfig,
        services: Services,
        doc: Box<dyn DocumentLayout>,
        measurer: Box<dyn TextMeasurer>,
    ) -> Self {
        let history = History::new(config.max_cache_mb * 1024 * 1024);
        let smooth = config.smooth_scrolling;
        Self {
            session: SessionId::next(),
            config,
            services,
            doc,
            measurer,
            url: String::new(),
            title_user: String::new(),
            state: RequestState::Blank,
            history,
            request: None,
            notifier: None,
            media_requests: Vec::new(),
            redirect_count: 0,
            input_prompted: false,
            url_changed: false,
            init_norm_scroll_y: 0.0,
            source_mime: String::new(),
            source_content: Vec::new(),
            source_time: None,
            source_status: StatusCode::NONE,
            cert: CertInfo::default(),
            bounds: Rect::default(),
            visible_on_screen: true,
            scroll: ScrollController::new(smooth),
            wide: WideOffsets::new(),
            wide_anim_runs: Vec::new(),
            visible: VisibleSets::default(),
            current_heading: None,
            side_icon_updates: 0,
            side_opacity: Anim::new(0.0),
            outline: Vec::new(),
            outline_opacity: Anim::new(0.0),
            scrollbar_thumb: None,
            center_vertically: false,
            ticker: Ticker::new(),
            player_timer: None,
            visbuf: VisBuf::new(),
            dirty: DirtyRuns::new(),
            needs_redraw: true,
            hover_link: None,
            hover_pos: Int2::ZERO,
            context_link: None,
            no_hover_while_scrolling: false,
            selecting: false,
            select_mark: None,
            found_mark: None,
            click: Click::new(MouseButton::Left),
            grabbed_player: None,
            link_keys: None,
            cursor: CursorShape::Arrow,
            events: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn title_user(&self) -> &str {
        &self.title_user
    }

    pub fn document(&self) -> &dyn DocumentLayout {
        &*self.doc
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// MIME type of the shown content.
    pub fn source_mime(&self) -> &str {
        &self.source_mime
    }

    /// Raw body of the last completed response.
    pub fn source_content(&self) -> &[u8] {
        &self.source_content
    }

    /// When the shown response was received.
    pub fn source_time(&self) -> Option<DateTime<Utc>> {
        self.source_time
    }

    pub fn is_request_ongoing(&self) -> bool {
        self.request.is_some()
    }

    pub fn trust_indicator(&self) -> TrustIndicator {
        self.cert.indicator()
    }

    pub fn scroll_y(&self) -> i32 {
        self.scroll.value(self.now())
    }

    pub fn scroll_max(&self) -> i32 {
        self.scroll.scroll_max()
    }

    pub fn cursor(&self) -> CursorShape {
        self.cursor
    }

    pub fn hover_link(&self) -> Option<LinkId> {
        self.hover_link
    }

    /// Currently selected text.
    pub fn selection(&self) -> Option<&str> {
        self.select_mark
            .filter(|m| !m.is_empty())
            .map(|m| m.text(self.doc.source()))
    }

    /// Source range of the last find match.
    pub fn found_range(&self) -> Option<Range<usize>> {
        self.found_mark.map(|m| m.range())
    }

    pub fn outline(&self) -> &[OutlineItem] {
        &self.outline
    }

    pub fn current_heading(&self) -> Option<&str> {
        self.current_heading
            .clone()
            .and_then(|r| self.doc.source().get(r))
    }

    /// Times the side icon had to be regenerated.
    pub fn side_icon_updates(&self) -> u32 {
        self.side_icon_updates
    }

    pub fn scrollbar_thumb(&self) -> Option<Rect> {
        self.scrollbar_thumb
    }

    pub fn link_keys_mode(&self) -> Option<OrdinalMode> {
        self.link_keys.map(|k| k.mode)
    }

    pub fn is_player_timer_running(&self) -> bool {
        self.player_timer.as_ref().is_some_and(PlayerTimer::is_running)
    }

    /// Whether the next [`Self::draw`] would change anything on screen.
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw || !self.dirty.is_empty()
    }

    /// Whether an animation wants [`Self::frame`] called.
    pub fn needs_frame(&self) -> bool {
        !self.ticker.is_empty()
    }

    /// Take the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    fn now(&self) -> u64 {
        self.services.clock.now_ms()
    }

    fn emit(&mut self, event: DocumentEvent) {
        log::trace!("session {}: {}", self.session.0, event.name());
        self.events.push(event);
    }

    fn is_active(&self) -> bool {
        self.services.focus.is_active(self.session)
    }

    // -------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------

    /// Make this the focused document.
    pub fn activate(&mut self) {
        self.services.focus.set_active(self.session);
        self.update_window_title();
        self.animate_players();
    }

    /// Show or hide the widget. Hidden widgets give back their buffers.
    pub fn set_visible(
        &mut self,
        visible: bool,
        canvas: &mut dyn crate::canvas::Canvas,
    ) -> Result<()> {
        self.visible_on_screen = visible;
        if !visible {
            self.visbuf.dealloc(canvas)?;
            self.player_timer = None;
        } else {
            self.needs_redraw = true;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------

    fn margin(&self) -> i32 {
        self.config.margin_px()
    }

    fn line_height(&self) -> i32 {
        self.measurer.line_height(FontId::Regular)
    }

    /// Links this close to the top of the view get no ordinal.
    fn ordinal_skip(&self) -> i32 {
        self.margin() * 4 / 5
    }

    /// Width the document is typeset to.
    pub fn document_width(&self) -> i32 {
        let c = &self.config;
        let avail = self.bounds.width() - 2 * self.margin();
        avail.min(c.font_size * c.line_width * c.zoom_percent / 100).max(0)
    }

    /// Rectangle the document occupies, in window coordinates, before
    /// scrolling.
    pub fn document_bounds(&self) -> Rect {
        let margin = self.margin();
        let width = self.document_width();
        let mut rect = Rect::new(
            self.bounds.mid().x - width / 2,
            self.bounds.top(),
            width,
            self.bounds.height() - margin,
        );
        if !self.doc.has_site_banner() {
            rect.pos.y += margin;
            rect.size.y -= margin;
        }
        if self.center_vertically {
            let doc_h = self.doc.size().y;
            if doc_h < rect.height() {
                let banner_h = self.doc.site_banner().map_or(0, |b| b.vis_bounds.height());
                let offset =
                    ((rect.height() + margin - doc_h - banner_h - self.line_height()) / 2).max(0);
                rect.pos.y += offset;
                rect.size.y = doc_h;
            }
        }
        rect
    }

    /// Document-space position of the window-space `pos`.
    fn document_pos(&self, pos: Int2) -> Int2 {
        let top_left = self.document_bounds().pos;
        Int2::new(pos.x - top_left.x, pos.y - top_left.y + self.scroll_y())
    }

    /// Window-space rectangle of document-space `rect`.
    fn view_rect(&self, rect: Rect) -> Rect {
        let top_left = self.document_bounds().pos;
        rect.moved(Int2::new(top_left.x, top_left.y - self.scroll_y()))
    }

    fn update_scroll_extent(&mut self) {
        let overscroll = if self.doc.has_site_banner() { 1 } else { 2 } * self.margin();
        self.scroll
            .set_extent(self.doc.size().y, self.bounds.height(), overscroll);
    }

    /// Place the widget. A width change relayouts the document, keeping the
    /// run at the middle of the view in place.
    pub fn set_bounds(&mut self, bounds: Rect) {
        let width_changed = bounds.width() != self.bounds.width();
        self.bounds = bounds;
        if width_changed {
            self.update_width_retaining_position();
        } else {
            self.update_scroll_extent();
            self.clamp_scroll();
            self.update_visible();
        }
        self.needs_redraw = true;
    }

    // -------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------

    /// Replace the document source and refresh everything derived from it.
    fn set_source(&mut self, source: &str) {
        self.doc.set_url(&self.url);
        let width = self.document_width();
        self.doc.set_source(source, width);
        self.runs_invalidated();
        self.select_mark = None;
        self.found_mark = None;
        self.wide.reset();
        self.wide_anim_runs.clear();
        self.update_window_title();
        self.update_visible();
        self.update_outline();
        self.invalidate();
        self.needs_redraw = true;
    }

    /// Forget everything that points into the previous layout.
    fn runs_invalidated(&mut self) {
        self.hover_link = None;
        self.context_link = None;
        self.grabbed_player = None;
        self.visible = VisibleSets::default();
        self.dirty.clear();
    }

    /// Discard the rendered buffers and pending run repaints.
    fn invalidate(&mut self) {
        self.visbuf.invalidate();
        self.dirty.clear();
        self.needs_redraw = true;
    }

    /// Queue `keys` for repainting. Keys from an older layout are ignored.
    fn mark_dirty(&mut self, keys: impl IntoIterator<Item = RunKey>) {
        let generation = self.doc.generation();
        self.dirty.sync(generation);
        self.dirty
            .extend(keys.into_iter().filter(|k| k.generation == generation));
        self.needs_redraw = true;
    }

    /// Repaint the visible runs of link `id`.
    fn invalidate_link(&mut self, id: LinkId) {
        let keys = self.visible.link_runs(&*self.doc, id);
        self.mark_dirty(keys);
    }

    fn invalidate_visible_links(&mut self) {
        let keys = self.visible.links.clone();
        self.mark_dirty(keys);
    }

    /// Rebuild the visible-run sets and everything that follows the scroll
    /// position.
    fn update_visible(&mut self) {
        let now = self.now();
        self.center_vertically = self.config.center_short_docs
            || self.url.starts_with("about:")
            || (self.source_status != StatusCode::NONE && !self.source_status.is_success());
        self.update_scroll_extent();
        let range = visible_range(
            self.scroll.value(now),
            self.bounds.height(),
            self.margin(),
            self.doc.has_site_banner(),
        );
        self.visible = VisibleSets::collect(&*self.doc, range);
        self.update_scrollbar(now);
        self.update_hover(self.hover_pos);
        self.update_side_opacity(true);
        self.update_side_icon();
        self.animate_players();
        if self.state == RequestState::Ready && self.doc.size().y > 0 {
            let norm = self.scroll.norm_pos(now);
            if let Some(recent) = self.history.most_recent_mut() {
                recent.norm_scroll_y = norm;
            }
        }
    }

    fn update_scrollbar(&mut self, now: u64) {
        const MIN_THUMB: i32 = 20;
        let doc_h = self.doc.size().y;
        let max = self.scroll.scroll_max();
        let view_h = self.bounds.height();
        self.scrollbar_thumb = if doc_h > 0 && max > 0 && view_h > 0 {
            let thumb_h = (view_h * view_h / doc_h).clamp(MIN_THUMB.min(view_h), view_h);
            let y = (view_h - thumb_h) * self.scroll.value(now).clamp(0, max) / max;
            let w = self.config.scrollbar_width;
            Some(Rect::new(
                self.bounds.right() - w,
                self.bounds.top() + y,
                w,
                thumb_h,
            ))
        } else {
            None
        };
    }

    /// Update the hovered link for a pointer at `mouse`.
    fn update_hover(&mut self, mouse: Int2) {
        self.hover_pos = mouse;
        let old = self.hover_link;
        self.hover_link = None;
        let allowed = matches!(
            self.state,
            RequestState::ReceivedPartial | RequestState::Ready
        ) && !self.no_hover_while_scrolling;
        if allowed && self.bounds.contains(mouse) {
            let pos = self.document_pos(mouse);
            // Click targets are slightly expanded so there are no gaps
            // between links.
            let e = self.config.gap / 2;
            self.hover_link = self
                .visible
                .links
                .iter()
                .filter_map(|&k| self.doc.run(k))
                .find(|r| {
                    let b = r.bounds;
                    Rect::new(b.left() - e, b.top() - e, b.width() + 2 * e, b.height() + 2 * e)
                        .contains(pos)
                })
                .and_then(|r| r.link_id);
        }
        if self.hover_link != old {
            if let Some(id) = old {
                self.invalidate_link(id);
            }
            if let Some(id) = self.hover_link {
                self.invalidate_link(id);
            }
        }
        if self.bounds.contains(mouse) && !self.scrollbar_rect().contains(mouse) {
            self.cursor = match self.hover_link {
                Some(id)
                    if self
                        .doc
                        .link(id)
                        .is_some_and(|l| l.flags.contains(LinkFlags::PERMANENT)) =>
                {
                    CursorShape::Arrow
                },
                Some(_) => CursorShape::Hand,
                None => CursorShape::IBeam,
            };
        }
    }

    fn scrollbar_rect(&self) -> Rect {
        let w = self.config.scrollbar_width;
        Rect::new(
            self.bounds.right() - w,
            self.bounds.top(),
            w,
            self.bounds.height(),
        )
    }

    // -------------------------------------------------------------------
    // Titles and theme
    // -------------------------------------------------------------------

    /// Pick the user name out of the URL path for titles and the theme.
    fn parse_user(&mut self) {
        static TILDE: OnceLock<Option<Regex>> = OnceLock::new();
        static USERS: OnceLock<Option<Regex>> = OnceLock::new();
        let tilde = TILDE.get_or_init(|| Regex::new(r"~([^/?]+)").ok());
        let users = USERS.get_or_init(|| Regex::new(r"(?i)/users/([^/?]+)").ok());
        let path = Url::parse(&self.url).map(|u| u.path).unwrap_or_default();
        self.title_user = [tilde, users]
            .into_iter()
            .flatten()
            .find_map(|re| re.captures(&path))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }

    fn update_theme(&mut self) {
        let seed = if self.title_user.is_empty() {
            Url::parse(&self.url).map(|u| u.host).unwrap_or_default()
        } else {
            self.title_user.clone()
        };
        self.doc.set_theme_seed(theme_hash(&seed));
    }

    fn title_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(title) = self.doc.title() {
            parts.push(title.to_string());
        }
        if !self.title_user.is_empty() {
            parts.push(self.title_user.clone());
        }
        parts
    }

    /// Title for the window: document title plus user or host.
    pub fn window_title(&self) -> String {
        let mut parts = self.title_parts();
        if self.title_user.is_empty() {
            match Url::parse(&self.url) {
                Some(u) if u.scheme.eq_ignore_ascii_case("about") => {
                    parts.push(self.config.app_name.clone());
                },
                Some(u) if !u.host.is_empty() => parts.push(u.host),
                _ => {},
            }
        }
        if parts.is_empty() {
            parts.push(self.config.app_name.clone());
        }
        parts.join(" \u{2014} ")
    }

    /// Title suggested for a bookmark of this page.
    pub fn bookmark_title(&self) -> String {
        let mut parts = self.title_parts();
        if parts.is_empty() {
            if let Some(u) = Url::parse(&self.url).filter(|u| !u.host.is_empty()) {
                parts.push(u.host);
            }
        }
        if parts.is_empty() {
            parts.push("Blank Page".to_string());
        }
        parts.join(" - ")
    }

    fn update_window_title(&mut self) {
        if self.is_active() {
            let title = self.window_title();
            self.emit(DocumentEvent::WindowTitle(title));
        }
    }

    // -------------------------------------------------------------------
    // Side elements
    // -------------------------------------------------------------------

    /// Fade the side icon in once the banner has scrolled out of view.
    fn update_side_opacity(&mut self, animated: bool) {
        let now = self.now();
        let scroll_y = self.scroll.value(now);
        let target = match self.doc.site_banner() {
            Some(b) if b.vis_bounds.bottom() < scroll_y => 1.0,
            _ => 0.0,
        };
        if (self.side_opacity.target() - target).abs() < f32::EPSILON {
            return;
        }
        let dur = match (animated, target > 0.5) {
            (false, _) => 0,
            (true, true) => SIDE_FADE_IN_MS,
            (true, false) => SIDE_FADE_OUT_MS,
        };
        self.side_opacity.set_value(target, now, dur);
        if dur > 0 {
            self.ticker.add(Animation::SideOpacity);
        }
        self.needs_redraw = true;
    }

    /// The side icon shows the current heading; rebuild it when that
    /// changes.
    fn update_side_icon(&mut self) {
        let heading = current_heading(&*self.doc, &self.visible);
        if heading != self.current_heading {
            self.current_heading = heading;
            self.side_icon_updates += 1;
            self.needs_redraw = true;
        }
    }

    fn update_outline(&mut self) {
        self.outline.clear();
        if self.state != RequestState::Ready || self.doc.size().y < 2 * self.bounds.height() {
            return;
        }
        let gap = self.config.gap;
        self.outline = self
            .doc
            .headings()
            .iter()
            .map(|h| OutlineItem {
                text: h.text.clone(),
                level: h.level,
                font: h.font,
                bounds: h.bounds,
                indent: h.level as i32 * 5 * gap + if h.level == 0 { gap * 3 / 2 } else { 0 },
            })
            .collect();
    }

    /// Fade the outline in while the pointer is over the scrollbar, or over
    /// the side area when `hover_outline` is set.
    fn update_outline_opacity(&mut self) {
        let now = self.now();
        if self.outline.is_empty() {
            self.outline_opacity.set_value(0.0, now, 0);
            return;
        }
        let over_side = self.config.hover_outline && {
            let doc = self.document_bounds();
            self.hover_pos.x >= doc.right() && self.bounds.contains(self.hover_pos)
        };
        let target = if self.scrollbar_rect().contains(self.hover_pos) || over_side {
            1.0
        } else {
            0.0
        };
        if (self.outline_opacity.target() - target).abs() < f32::EPSILON {
            return;
        }
        let dur = if target > 0.5 { OUTLINE_FADE_IN_MS } else { OUTLINE_FADE_OUT_MS };
        self.outline_opacity.set_value(target, now, dur);
        self.ticker.add(Animation::OutlineOpacity);
    }

    // -------------------------------------------------------------------
    // Players
    // -------------------------------------------------------------------

    /// Keep the refresh timer running while a visible player needs it.
    fn animate_players(&mut self) {
        let wants_timer = self.is_active()
            && self.visible_on_screen
            && self.visible.players.iter().any(|&k| {
                self.doc
                    .run(k)
                    .and_then(|r| r.audio_id)
                    .and_then(|id| self.doc.media().player(id))
                    .is_some_and(|p| p.needs_refresh())
            });
        if wants_timer {
            self.needs_redraw = true;
            if self.player_timer.is_none() {
                log::debug!("session {}: player timer started", self.session.0);
                self.player_timer = Some(PlayerTimer::start(
                    self.session,
                    self.services.notify.clone(),
                ));
            }
        } else if self.player_timer.take().is_some() {
            log::debug!("session {}: player timer stopped", self.session.0);
        }
    }

    fn on_player_tick(&mut self) {
        let now = self.now();
        let ids: Vec<MediaId> = self
            .visible
            .players
            .iter()
            .filter_map(|&k| self.doc.run(k).and_then(|r| r.audio_id))
            .collect();
        for id in ids {
            if let Some(player) = self.doc.media_mut().player_mut(id) {
                player.expire_volume_ui(now, VOLUME_UI_IDLE_MS);
            }
        }
        self.needs_redraw = true;
        self.animate_players();
    }

    // -------------------------------------------------------------------
    // Notifications and frames
    // -------------------------------------------------------------------

    /// Act on a notification from background work. Returns false when it
    /// was not for this widget or refers to a request that is gone.
    pub fn handle_notification(&mut self, n: Notification) -> bool {
        if n.session() != self.session {
            return false;
        }
        match n {
            Notification::ResponseUpdated(_, id) => {
                if !self.is_current_request(id) {
                    log::trace!("session {}: stale update ignored", self.session.0);
                    return false;
                }
                if let Some(notifier) = &self.notifier {
                    notifier.clear_pending();
                }
                self.on_response_updated();
            },
            Notification::ResponseFinished(_, id) => {
                if !self.is_current_request(id) {
                    log::trace!("session {}: stale finish ignored", self.session.0);
                    return false;
                }
                self.on_response_finished();
            },
            Notification::MediaUpdated(_, link, id) => return self.on_media_updated(link, id),
            Notification::MediaFinished(_, link, id) => return self.on_media_finished(link, id),
            Notification::PlayerUpdate(_) => self.on_player_tick(),
        }
        true
    }

    /// Advance running animations by one frame.
    pub fn frame(&mut self) {
        let now = self.now();
        for anim in self.ticker.take() {
            match anim {
                Animation::Scroll => self.refresh_while_scrolling(now),
                Animation::SideOpacity => {
                    if !self.side_opacity.is_finished(now) {
                        self.ticker.add(anim);
                    }
                },
                Animation::OutlineOpacity => {
                    if !self.outline_opacity.is_finished(now) {
                        self.ticker.add(anim);
                    }
                },
            }
            self.needs_redraw = true;
        }
    }

    // -------------------------------------------------------------------
    // Session state
    // -------------------------------------------------------------------

    /// Serialize the URL and history for restoring later.
    pub fn serialize_state(&self) -> Result<String> {
        let record = SessionRecord {
            url: self.url.clone(),
            history: self.history.clone(),
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Restore a session saved with [`Self::serialize_state`]. A cached
    /// response for the URL is shown without fetching.
    pub fn restore_state(&mut self, json: &str) -> Result<()> {
        let record: SessionRecord = serde_json::from_str(json)?;
        self.history = record.history;
        self.history
            .set_cache_budget(self.config.max_cache_mb * 1024 * 1024);
        if !record.url.is_empty() {
            self.redirect_count = 0;
            self.set_url(&record.url, true);
        }
        Ok(())
    }
}

/// 32-bit FNV-1a, used to seed the theme from a host or user name.
fn theme_hash(s: &str) -> u32 {
    s.bytes().fold(0x811c_9dc5, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193))
}

#[cfg(test)]
mod tests;
