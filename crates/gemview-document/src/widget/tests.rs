use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use gemview_net::StatusCode;
use gemview_net::certs::{CertStore, MemoryCertStore};
use gemview_types::geometry::Rect;
use gemview_types::input::{InputEvent, Key, Modifiers, WheelClass};
use gemview_types::palette::ColorId;
use gemview_ui::clock::{Clock, ManualClock};

use super::*;
use crate::commands::Command;
use crate::events::{DocumentEvent, Notification, OpenMode};
use crate::fetch::Fetcher;
use crate::focus::FocusRegistry;
use crate::layout::{Run, RunFlags};
use crate::ordinal::OrdinalMode;
use crate::test_utils::{DrawCall, MockCanvas, MockFetcher, MockHandle};

struct Harness {
    widget: DocumentWidget,
    fetcher: Arc<MockFetcher>,
    clock: Arc<ManualClock>,
    rx: Receiver<Notification>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    fn with_config(config: DocumentConfig) -> Self {
        let fetcher = Arc::new(MockFetcher::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let (tx, rx) = mpsc::channel();
        let dyn_fetcher: Arc<dyn Fetcher> = Arc::clone(&fetcher) as Arc<dyn Fetcher>;
        let dyn_clock: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
        let certs: Arc<dyn CertStore> = Arc::new(MemoryCertStore::new());
        let services = Services {
            fetcher: dyn_fetcher,
            certs,
            focus: FocusRegistry::new(),
            clock: dyn_clock,
            notify: tx,
        };
        let mut widget = DocumentWidget::new(config, services);
        widget.set_bounds(Rect::new(0, 0, 800, 600));
        Self {
            widget,
            fetcher,
            clock,
            rx,
        }
    }

    /// Deliver queued notifications the way the UI thread would.
    fn pump(&mut self) {
        while let Ok(n) = self.rx.try_recv() {
            self.widget.handle_notification(n);
        }
    }

    fn load(&mut self, url: &str, status: StatusCode, meta: &str, body: &str) -> MockHandle {
        self.widget.open(url);
        let handle = self.fetcher.last();
        handle.respond(status, meta, body.as_bytes());
        self.pump();
        handle
    }

    fn load_gemtext(&mut self, url: &str, body: &str) -> MockHandle {
        self.load(url, StatusCode::SUCCESS, "text/gemini", body)
    }

    fn source(&self) -> &str {
        self.widget.document().source()
    }

    fn settle(&mut self) {
        self.clock.advance(2_000);
        self.widget.frame();
    }
}

fn long_page() -> String {
    let mut s = String::from("# Long\n");
    for i in 0..200 {
        s.push_str(&format!("Line number {i}\n"));
    }
    s
}

fn outline_texts(h: &Harness) -> Vec<String> {
    h.widget
        .outline()
        .iter()
        .map(|item| h.source()[item.text.clone()].to_string())
        .collect()
}

/// Window position of the middle of the label of link `id`.
fn link_label_pos(h: &Harness, id: LinkId) -> Int2 {
    let run = h
        .widget
        .document()
        .runs()
        .iter()
        .find(|r| {
            r.link_id == Some(id) && !r.is_decoration() && r.image_id.is_none() && r.audio_id.is_none()
        })
        .expect("link label run");
    h.widget.view_rect(run.bounds).mid()
}

fn left_click(h: &mut Harness, pos: Int2) {
    let mods = Modifiers::NONE;
    h.widget.handle_input(&InputEvent::MouseMove { pos, mods });
    h.widget.handle_input(&InputEvent::MouseDown {
        button: MouseButton::Left,
        pos,
        mods,
        clicks: 1,
    });
    h.widget.handle_input(&InputEvent::MouseUp {
        button: MouseButton::Left,
        pos,
        mods,
    });
}

fn wheel(pos: Int2, dx: i32, dy: i32, class: WheelClass) -> InputEvent {
    InputEvent::Wheel {
        delta: Int2::new(dx, dy),
        pos,
        class,
        mods: Modifiers::NONE,
    }
}

fn key(k: Key) -> InputEvent {
    InputEvent::KeyDown {
        key: k,
        mods: Modifiers::NONE,
        repeat: false,
    }
}

#[test]
fn gemtext_response_becomes_ready_page() {
    let mut h = Harness::new();
    assert_eq!(h.widget.state(), RequestState::Blank);
    h.load_gemtext("gemini://example.org/", "# Hello\nWorld\n");

    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(!h.widget.is_request_ongoing());
    assert_eq!(h.widget.document().title(), Some("Hello"));
    assert_eq!(h.widget.window_title(), "Hello \u{2014} example.org");
    assert_eq!(h.widget.bookmark_title(), "Hello");
    assert_eq!(h.widget.source_mime(), "text/gemini");
    assert!(h.widget.source_time().is_some());

    let names: Vec<_> = h.widget.take_events().iter().map(DocumentEvent::name).collect();
    let started = names.iter().position(|n| *n == "document.request.started");
    let finished = names.iter().position(|n| *n == "document.request.finished");
    assert!(started.is_some() && finished.is_some());
    assert!(started < finished);
}

#[test]
fn unsupported_type_shows_page_and_keeps_bytes() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/blob");
    h.fetcher
        .last()
        .header(StatusCode::SUCCESS, "application/octet-stream");
    h.fetcher.last().body(&[0, 1, 2, 3]);
    h.fetcher.last().finish();
    h.pump();

    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(h.source().contains("Unsupported Content Type"));
    assert!(h.source().contains("application/octet-stream"));
    assert_eq!(h.widget.source_content(), &[0, 1, 2, 3]);
    assert_eq!(h.widget.source_mime(), "application/octet-stream");
}

#[test]
fn unsupported_content_can_be_saved() {
    let dir = tempfile::tempdir().unwrap();
    let config = DocumentConfig {
        downloads_dir: dir.path().to_path_buf(),
        ..DocumentConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.load(
        "gemini://example.org/data.bin",
        StatusCode::SUCCESS,
        "application/octet-stream",
        "payload",
    );
    h.widget.take_events();

    assert!(h.widget.handle_command(&Command::Save));
    let events = h.widget.take_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, DocumentEvent::Message(m) if m.starts_with("Saved to Downloads")))
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn save_while_loading_is_refused() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/");
    h.widget.take_events();
    h.widget.save_page();
    let events = h.widget.take_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, DocumentEvent::Message(m) if m.starts_with("Page Incomplete")))
    );
}

#[test]
fn empty_redirect_is_invalid() {
    let mut h = Harness::new();
    h.load("gemini://example.org/", StatusCode::REDIRECT_TEMPORARY, "", "");
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(h.source().contains("Invalid Redirect"));
    assert_eq!(h.fetcher.count(), 1);
    assert_eq!(h.widget.redirect_count, 0);
}

#[test]
fn redirects_followed_up_to_the_limit() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/0");
    for i in 1..=6 {
        h.fetcher.last().respond(
            StatusCode::REDIRECT_TEMPORARY,
            &format!("/{i}"),
            b"",
        );
        h.pump();
    }
    // The first five were followed; the sixth hits the limit.
    assert_eq!(h.fetcher.count(), 6);
    assert_eq!(h.widget.url(), "gemini://example.org/5");
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(h.source().contains("Too Many Redirects"));
    assert!(h.source().contains("=> gemini://example.org/6"));
    assert_eq!(h.widget.history().len(), 1);
    assert_eq!(h.widget.history().current().unwrap().url, "gemini://example.org/5");
}

#[test]
fn redirect_to_other_host_is_followed() {
    let mut h = Harness::new();
    h.load(
        "gemini://example.org/",
        StatusCode::REDIRECT_PERMANENT,
        "gemini://other.example/",
        "",
    );
    assert_eq!(h.fetcher.count(), 2);
    assert_eq!(h.widget.url(), "gemini://other.example/");
    assert_eq!(h.widget.state(), RequestState::Fetching);
}

#[test]
fn scheme_change_redirect_needs_approval() {
    let mut h = Harness::new();
    h.load(
        "gemini://example.org/",
        StatusCode::REDIRECT_PERMANENT,
        "https://example.org/",
        "",
    );
    assert_eq!(h.fetcher.count(), 1);
    assert!(h.source().contains("Scheme-Changing Redirect"));
    assert!(h.source().contains("=> https://example.org/"));
}

#[test]
fn error_status_shows_error_page() {
    let mut h = Harness::new();
    h.load("gemini://example.org/missing", StatusCode::NOT_FOUND, "nope", "");
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(h.source().contains("Not Found"));
    assert!(h.widget.center_vertically);
}

#[test]
fn header_less_finish_is_invalid_header() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/");
    h.fetcher.last().finish();
    h.pump();
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(h.source().contains("Unrecognized Response"));
}

#[test]
fn page_scroll_at_bottom_stays_put() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", &long_page());
    assert!(h.widget.scroll_max() > 0);

    assert!(h.widget.handle_command(&Command::ScrollBottom));
    let bottom = h.widget.scroll_y();
    assert_eq!(bottom, h.widget.scroll_max());

    assert!(h.widget.handle_command(&Command::ScrollPage(1)));
    h.settle();
    assert_eq!(h.widget.scroll_y(), bottom);
    assert!(h.widget.handle_command(&Command::ScrollPage(1)));
    h.settle();
    assert_eq!(h.widget.scroll_y(), bottom);
}

#[test]
fn page_scroll_moves_half_a_view() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", &long_page());
    let half = (h.widget.document_bounds().height() as f32 * 0.5) as i32;

    h.widget.handle_input(&key(Key::PageDown));
    assert!(h.widget.needs_frame());
    h.settle();
    assert_eq!(h.widget.scroll_y(), half);

    h.widget.handle_input(&key(Key::Home));
    assert_eq!(h.widget.scroll_y(), 0);
}

#[test]
fn back_replays_cached_page_without_fetching() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/a", &format!("# Page A\n{}", long_page()));
    h.load_gemtext("gemini://example.org/b", &format!("# Page B\n{}", long_page()));
    assert_eq!(h.fetcher.count(), 2);
    assert_eq!(outline_texts(&h), ["Page B", "Long"]);
    h.widget.take_events();

    assert!(h.widget.navigate_back());
    assert_eq!(h.fetcher.count(), 2);
    assert_eq!(h.widget.url(), "gemini://example.org/a");
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert_eq!(h.widget.document().title(), Some("Page A"));
    let headings: Vec<_> = h
        .widget
        .document()
        .headings()
        .iter()
        .map(|hd| &h.source()[hd.text.clone()])
        .collect();
    assert_eq!(headings, ["Page A", "Long"]);
    assert_eq!(outline_texts(&h), ["Page A", "Long"]);
    let events = h.widget.take_events();
    assert!(events.iter().any(|e| matches!(e, DocumentEvent::Changed { .. })));
    assert!(!events.iter().any(|e| matches!(e, DocumentEvent::RequestStarted { .. })));

    assert!(h.widget.navigate_forward());
    assert_eq!(h.widget.document().title(), Some("Page B"));
    assert!(!h.widget.navigate_forward());
}

#[test]
fn reload_fetches_again() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "# One\n");
    assert!(h.widget.handle_command(&Command::Reload));
    assert_eq!(h.fetcher.count(), 2);
    h.fetcher
        .last()
        .respond(StatusCode::SUCCESS, "text/gemini", b"# Two\n");
    h.pump();
    assert_eq!(h.widget.document().title(), Some("Two"));
    assert_eq!(h.widget.history().len(), 1);
}

#[test]
fn stale_notifications_are_ignored() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/first");
    let first = h.fetcher.last();
    h.widget.open("gemini://example.org/second");
    assert!(first.is_cancelled());

    let session = h.widget.session();
    assert!(!h.widget.handle_notification(Notification::ResponseFinished(session, first.id)));
    assert!(!h.widget.handle_notification(Notification::ResponseUpdated(session, first.id)));
    assert_eq!(h.widget.state(), RequestState::Fetching);

    let current = h.fetcher.last();
    let other = SessionId(session.0 + 1_000);
    assert!(!h.widget.handle_notification(Notification::ResponseFinished(other, current.id)));
    assert!(h.widget.is_request_ongoing());
}

#[test]
fn stop_without_history_leaves_ready_state() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/");
    let handle = h.fetcher.last();
    assert_eq!(h.widget.state(), RequestState::Fetching);

    assert!(h.widget.handle_command(&Command::Stop));
    assert!(handle.is_cancelled());
    assert_eq!(h.widget.state(), RequestState::Ready);
    let events = h.widget.take_events();
    assert!(events.iter().any(|e| matches!(e, DocumentEvent::RequestCancelled { .. })));
}

#[test]
fn stop_returns_to_previous_page() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/a", "# Page A\n");
    h.widget.open("gemini://example.org/slow");
    h.widget.stop();
    assert_eq!(h.widget.url(), "gemini://example.org/a");
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert_eq!(h.widget.document().title(), Some("Page A"));
    assert_eq!(h.fetcher.count(), 2);
}

#[test]
fn state_never_returns_to_blank() {
    let mut h = Harness::new();
    let mut seen = vec![h.widget.state()];
    h.widget.open("gemini://example.org/");
    seen.push(h.widget.state());
    h.fetcher.last().header(StatusCode::SUCCESS, "text/gemini");
    h.pump();
    seen.push(h.widget.state());
    h.fetcher.last().body(b"# Partial\n");
    h.pump();
    seen.push(h.widget.state());
    h.fetcher.last().finish();
    h.pump();
    seen.push(h.widget.state());
    h.widget.reload();
    seen.push(h.widget.state());
    h.widget.stop();
    seen.push(h.widget.state());

    assert_eq!(
        seen,
        [
            RequestState::Blank,
            RequestState::Fetching,
            RequestState::ReceivedPartial,
            RequestState::ReceivedPartial,
            RequestState::Ready,
            RequestState::Fetching,
            RequestState::Ready,
        ]
    );
}

#[test]
fn partial_body_is_shown_while_loading() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/");
    let handle = h.fetcher.last();
    handle.header(StatusCode::SUCCESS, "text/gemini");
    h.pump();
    handle.body(b"# Streaming\nfirst line\n");
    h.pump();
    assert_eq!(h.widget.state(), RequestState::ReceivedPartial);
    assert_eq!(h.widget.document().title(), Some("Streaming"));
    let events = h.widget.take_events();
    assert!(events.iter().any(|e| matches!(e, DocumentEvent::RequestUpdated { .. })));
}

#[test]
fn input_prompt_is_requested_once() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/search");
    let handle = h.fetcher.last();
    handle.header(StatusCode::INPUT, "Search terms?");
    h.pump();
    handle.header(StatusCode::INPUT, "Search terms?");
    h.pump();
    handle.finish();
    h.pump();

    let prompts: Vec<_> = h
        .widget
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            DocumentEvent::InputRequested {
                prompt, sensitive, ..
            } => Some((prompt, sensitive)),
            _ => None,
        })
        .collect();
    assert_eq!(prompts, [("Search terms?".to_string(), false)]);
    assert_eq!(h.widget.state(), RequestState::Fetching);
    assert!(!h.widget.is_request_ongoing());

    assert!(h.widget.handle_command(&Command::InputSubmit("gemini rust".into())));
    assert_eq!(h.fetcher.last().url, "gemini://example.org/search?gemini%20rust");
    assert_eq!(h.widget.history().len(), 2);
}

#[test]
fn sensitive_input_prompt_uses_default_text() {
    let mut h = Harness::new();
    h.load("gemini://example.org/login", StatusCode::SENSITIVE_INPUT, "", "");
    let events = h.widget.take_events();
    let prompt = events.iter().find_map(|e| match e {
        DocumentEvent::InputRequested {
            prompt, sensitive, ..
        } => Some((prompt.clone(), *sensitive)),
        _ => None,
    });
    assert_eq!(
        prompt,
        Some(("Please enter input for /login:".to_string(), true))
    );
}

#[test]
fn cancelled_input_returns_to_previous_page() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "# Home\n");
    h.load("gemini://example.org/q", StatusCode::INPUT, "Query?", "");
    assert!(h.widget.handle_command(&Command::InputCancel));
    assert_eq!(h.widget.url(), "gemini://example.org/");
    assert_eq!(h.widget.state(), RequestState::Ready);
}

#[test]
fn find_marks_matches_and_wraps() {
    let mut h = Harness::new();
    h.load_gemtext(
        "gemini://example.org/",
        "# Title\nalpha beta\nbeta gamma\n",
    );
    let source = h.source().to_string();

    assert!(h.widget.find_next("beta"));
    let first = h.widget.found_range().unwrap();
    assert_eq!(&source[first.clone()], "beta");

    assert!(h.widget.find_next("beta"));
    let second = h.widget.found_range().unwrap();
    assert!(second.start > first.start);

    assert!(h.widget.find_next("beta"));
    assert_eq!(h.widget.found_range(), Some(first.clone()));

    assert!(h.widget.find_prev("beta"));
    assert_eq!(h.widget.found_range(), Some(second));

    assert!(!h.widget.find_next("zzz"));
    assert_eq!(h.widget.found_range(), None);
}

#[test]
fn link_keys_open_the_chosen_link() {
    let mut h = Harness::new();
    h.load_gemtext(
        "gemini://example.org/",
        "# Links\n=> gemini://example.org/one One\n=> gemini://example.org/two Two\n",
    );
    assert!(h.widget.handle_command(&Command::LinkKeys {
        mode: OrdinalMode::NumbersAndAlphabet,
        release: false,
    }));
    assert_eq!(h.widget.link_keys_mode(), Some(OrdinalMode::NumbersAndAlphabet));

    assert!(h.widget.handle_input(&key(Key::Char('2'))));
    assert_eq!(h.widget.link_keys_mode(), None);
    assert_eq!(h.widget.url(), "gemini://example.org/two");
    assert_eq!(h.fetcher.last().url, "gemini://example.org/two");
}

#[test]
fn link_keys_need_a_loaded_page() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/");
    assert!(!h.widget.handle_command(&Command::LinkKeys {
        mode: OrdinalMode::HomeRow,
        release: false,
    }));
    assert_eq!(h.widget.link_keys_mode(), None);
}

#[test]
fn escape_leaves_link_keys() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "=> gemini://example.org/one One\n");
    h.widget.handle_command(&Command::LinkKeys {
        mode: OrdinalMode::HomeRow,
        release: false,
    });
    assert!(h.widget.handle_input(&key(Key::Escape)));
    assert_eq!(h.widget.link_keys_mode(), None);
    assert_eq!(h.fetcher.count(), 1);
}

#[test]
fn foreign_scheme_goes_to_default_browser() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "=> https://example.com/ Web\n");
    h.widget.take_events();
    h.widget.open_link(1, OpenMode::Current);
    assert_eq!(h.fetcher.count(), 1);
    let events = h.widget.take_events();
    assert!(events.contains(&DocumentEvent::Open {
        url: "https://example.com/".into(),
        mode: OpenMode::DefaultBrowser,
    }));
}

#[test]
fn copy_without_selection_copies_source() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "# Copy me\n");
    h.widget.take_events();
    let ctrl_c = InputEvent::KeyDown {
        key: Key::Char('c'),
        mods: Modifiers {
            primary: true,
            ..Modifiers::NONE
        },
        repeat: false,
    };
    assert!(h.widget.handle_input(&ctrl_c));
    assert_eq!(
        h.widget.take_events(),
        [DocumentEvent::Clipboard("# Copy me\n".into())]
    );
}

#[test]
fn draw_renders_visible_text() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "# Hello\nSome paragraph text.\n");
    let mut canvas = MockCanvas::new();
    h.widget.draw(&mut canvas).unwrap();

    assert!(canvas.has_text("Hello"));
    assert!(canvas.has_text("Some paragraph text."));
    assert!(canvas.blit_count() >= 1);
    assert!(canvas.live_textures() > 0);
    assert!(!h.widget.needs_redraw());

    // A second frame with nothing changed only blits the buffers.
    canvas.clear();
    h.widget.draw(&mut canvas).unwrap();
    assert!(!canvas.has_text("Some paragraph text."));
    assert!(canvas.blit_count() >= 1);

    h.widget.set_visible(false, &mut canvas).unwrap();
    assert_eq!(canvas.live_textures(), 0);
}

#[test]
fn long_page_has_scrollbar_and_outline() {
    let mut h = Harness::new();
    let mut page = long_page();
    page.push_str("## Second section\nMore text\n");
    h.load_gemtext("gemini://example.org/", &page);
    assert!(h.widget.scrollbar_thumb().is_some());
    let outline = h.widget.outline();
    assert_eq!(outline.len(), 2);
    assert!(outline[1].indent > outline[0].indent);
}

#[test]
fn session_state_round_trips_through_json() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/saved", "# Saved page\n");
    let json = h.widget.serialize_state().unwrap();

    let mut restored = Harness::new();
    restored.widget.restore_state(&json).unwrap();
    assert_eq!(restored.fetcher.count(), 0);
    assert_eq!(restored.widget.url(), "gemini://example.org/saved");
    assert_eq!(restored.widget.state(), RequestState::Ready);
    assert_eq!(restored.widget.document().title(), Some("Saved page"));
    assert!(restored.widget.restore_state("not json").is_err());
}

#[test]
fn untrusted_certificate_can_be_trusted() {
    let mut h = Harness::new();
    h.widget.open("gemini://example.org/");
    let handle = h.fetcher.last();
    handle.edit(|r| {
        r.cert_flags = CertFlags::AVAILABLE
            | CertFlags::HAVE_FINGERPRINT
            | CertFlags::DOMAIN_VERIFIED
            | CertFlags::TIME_VERIFIED;
        r.cert_fingerprint = vec![0xab; 32];
    });
    handle.respond(StatusCode::SUCCESS, "text/gemini", b"# Secure\n");
    h.pump();
    assert_eq!(h.widget.trust_indicator(), TrustIndicator::Untrusted);
    assert!(h.widget.certificate_summary().contains("Trusted: no"));

    assert!(h.widget.handle_command(&Command::TrustCert));
    assert_eq!(h.fetcher.count(), 2);
    assert!(!h.widget.handle_command(&Command::TrustCert));
}

#[test]
fn missing_certificate_is_unavailable() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "# Plain\n");
    assert_eq!(h.widget.trust_indicator(), TrustIndicator::Unavailable);
    assert_eq!(h.widget.certificate_summary(), "No certificate");
    assert!(!h.widget.trust_certificate());
}

#[test]
fn clicking_permanent_image_link_does_not_refetch() {
    let mut h = Harness::new();
    h.load("gemini://example.org/pic.png", StatusCode::SUCCESS, "image/png", "not really a png");
    assert_eq!(h.fetcher.count(), 1);
    let flags = h.widget.document().link(1).unwrap().flags;
    assert!(flags.contains(LinkFlags::CONTENT | LinkFlags::PERMANENT));

    let pos = link_label_pos(&h, 1);
    left_click(&mut h, pos);
    assert_eq!(h.widget.hover_link, Some(1));
    assert_eq!(h.fetcher.count(), 1);
    assert_eq!(h.widget.url(), "gemini://example.org/pic.png");
    assert_eq!(h.widget.state(), RequestState::Ready);
    assert!(h.widget.media_requests.is_empty());
}

#[test]
fn link_key_on_image_link_navigates() {
    let mut h = Harness::new();
    h.load_gemtext(
        "gemini://example.org/",
        "# Pics\n=> gemini://example.org/pic.png Picture\n",
    );
    h.widget.handle_command(&Command::LinkKeys {
        mode: OrdinalMode::NumbersAndAlphabet,
        release: false,
    });
    assert!(h.widget.handle_input(&key(Key::Char('1'))));
    assert_eq!(h.widget.url(), "gemini://example.org/pic.png");
    assert_eq!(h.fetcher.last().url, "gemini://example.org/pic.png");
    assert!(h.widget.media_requests.is_empty());
    assert_eq!(h.widget.state(), RequestState::Fetching);
}

#[test]
fn precise_wheel_scrolls_without_animation() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", &long_page());
    h.settle();
    let pos = Int2::new(400, 300);

    assert!(h.widget.handle_input(&wheel(pos, 0, -40, WheelClass::Precise)));
    assert_eq!(h.widget.scroll_y(), 40);
    assert!(h.widget.scroll.is_finished(h.widget.now()));

    assert!(h.widget.handle_input(&wheel(pos, 0, 15, WheelClass::Precise)));
    assert_eq!(h.widget.scroll_y(), 25);

    assert!(!h.widget.handle_input(&wheel(Int2::new(900, 300), 0, -40, WheelClass::Precise)));
    assert_eq!(h.widget.scroll_y(), 25);
}

#[test]
fn stepped_wheel_scrolls_three_lines_and_speeds_up() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", &long_page());
    h.settle();
    let pos = Int2::new(400, 300);
    let lh = h.widget.line_height();

    h.widget.handle_input(&wheel(pos, 0, -1, WheelClass::Stepped));
    assert!(h.widget.needs_frame());
    assert_eq!(h.widget.scroll_y(), 0);
    assert_eq!(h.widget.scroll.target(), 3 * lh);
    let now = h.widget.now();
    assert!(!h.widget.scroll.is_finished(now + 599));

    // A second notch right away runs at half the duration.
    h.widget.handle_input(&wheel(pos, 0, -1, WheelClass::Stepped));
    assert_eq!(h.widget.scroll.target(), 6 * lh);
    assert!(!h.widget.scroll.is_finished(now + 299));
    assert!(h.widget.scroll.is_finished(now + 300));

    h.clock.advance(300);
    h.widget.frame();
    assert_eq!(h.widget.scroll_y(), 6 * lh);
}

fn wide_page() -> String {
    format!("# Code\nIntro paragraph\n```\nshort\n{}\n```\n", "x".repeat(120))
}

fn widest_pre_run(h: &Harness) -> &Run {
    h.widget
        .document()
        .runs()
        .iter()
        .filter(|r| r.flags.contains(RunFlags::WIDE))
        .max_by_key(|r| r.vis_bounds.width())
        .expect("wide run")
}

#[test]
fn wide_block_scroll_is_clamped_and_clears_marks() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/code", &wide_page());
    let run = widest_pre_run(&h);
    let pre = run.pre_id.unwrap();
    let pos = h.widget.view_rect(run.bounds).mid();
    let max = run.vis_bounds.width() - h.widget.document_width() + h.widget.margin();
    assert!(max > 0);

    assert!(h.widget.find_next("short"));
    h.widget.select_mark = Some(Mark::new(0, 4));
    h.widget.handle_input(&wheel(pos, -500, 0, WheelClass::Precise));
    assert_eq!(h.widget.wide.offset(pre), max);
    assert!(h.widget.select_mark.is_none());
    assert!(h.widget.found_mark.is_none());
    let keys = h.widget.document().preformatted_runs(pre);
    assert_eq!(keys.len(), 2);
    for k in keys {
        assert!(h.widget.dirty.contains(k));
    }

    h.widget.handle_input(&wheel(pos, -500, 0, WheelClass::Precise));
    assert_eq!(h.widget.wide.offset(pre), max);
    h.widget.handle_input(&wheel(pos, 1_000, 0, WheelClass::Precise));
    assert_eq!(h.widget.wide.offset(pre), 0);
}

#[test]
fn stepped_sideways_wheel_animates_wide_block() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/code", &wide_page());
    h.settle();
    let run = widest_pre_run(&h);
    let pre = run.pre_id.unwrap();
    let pos = h.widget.view_rect(run.bounds).mid();
    let lh = h.widget.line_height();

    h.widget.handle_input(&wheel(pos, -1, 0, WheelClass::Stepped));
    assert_eq!(h.widget.wide.offset(pre), 3 * lh);
    assert!(h.widget.wide.is_animating(h.widget.now()));
    assert!(h.widget.needs_frame());
    assert_eq!(h.widget.scroll_y(), 0);
}

#[test]
fn wide_scroll_repaints_only_the_block() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/code", &wide_page());
    let mut canvas = MockCanvas::new();
    h.widget.draw(&mut canvas).unwrap();
    assert!(canvas.has_text("Intro paragraph"));
    canvas.clear();

    let run = widest_pre_run(&h);
    let pos = h.widget.view_rect(run.bounds).mid();
    let band_height = run.vis_bounds.height();
    h.widget.handle_input(&wheel(pos, -40, 0, WheelClass::Precise));
    assert!(h.widget.needs_redraw());
    h.widget.draw(&mut canvas).unwrap();

    let bounds = h.widget.bounds;
    let bands: Vec<Rect> = canvas
        .calls
        .iter()
        .filter_map(|c| match c {
            DrawCall::SetClip { rect } if *rect != bounds => Some(*rect),
            _ => None,
        })
        .collect();
    assert_eq!(bands.len(), 2);
    let fills = canvas.fills_of(ColorId::Background);
    for band in &bands {
        assert_eq!(band.left(), 0);
        assert_eq!(band.width(), bounds.width());
        assert_eq!(band.height(), band_height);
        assert!(fills.contains(band));
    }
    assert!(canvas.has_text("short"));
    assert!(canvas.has_text("xxxxxxxx"));
    assert!(!canvas.has_text("Intro paragraph"));
    assert!(h.widget.dirty.is_empty());
}

#[test]
fn backwards_drag_selects_and_copies_the_range() {
    let mut h = Harness::new();
    h.load_gemtext("gemini://example.org/", "# Sel\nalpha beta gamma\n");
    let source = h.source().to_string();
    let first = h
        .widget
        .document()
        .runs()
        .iter()
        .find(|r| !r.is_decoration() && source[r.text.clone()].starts_with("alpha"))
        .map(|r| h.widget.view_rect(r.bounds))
        .unwrap();
    let line_right = h
        .widget
        .document()
        .runs()
        .iter()
        .map(|r| h.widget.view_rect(r.bounds))
        .filter(|r| r.top() == first.top())
        .map(|r| r.right())
        .max()
        .unwrap();
    let y = first.mid().y;
    let start = Int2::new(line_right + 16, y);
    let end = Int2::new(first.left() + 1, y);
    let mods = Modifiers::NONE;

    h.widget.handle_input(&InputEvent::MouseDown {
        button: MouseButton::Left,
        pos: start,
        mods,
        clicks: 1,
    });
    h.widget.handle_input(&InputEvent::MouseMove { pos: end, mods });
    h.widget.handle_input(&InputEvent::MouseUp {
        button: MouseButton::Left,
        pos: end,
        mods,
    });

    let mark = h.widget.select_mark.unwrap();
    assert!(mark.start > mark.end);
    assert_eq!(h.widget.selection(), Some("alpha beta gamma"));

    h.widget.take_events();
    let ctrl_c = InputEvent::KeyDown {
        key: Key::Char('c'),
        mods: Modifiers {
            primary: true,
            ..Modifiers::NONE
        },
        repeat: false,
    };
    assert!(h.widget.handle_input(&ctrl_c));
    assert_eq!(
        h.widget.take_events(),
        [DocumentEvent::Clipboard("alpha beta gamma".into())]
    );
}

#[test]
fn clicking_image_link_toggles_inline_image() {
    let mut h = Harness::new();
    h.load_gemtext(
        "gemini://example.org/",
        "# Pics\n=> gemini://example.org/pic.png Picture\n",
    );

    let pos = link_label_pos(&h, 1);
    left_click(&mut h, pos);
    assert_eq!(h.fetcher.count(), 2);
    assert_eq!(h.widget.url(), "gemini://example.org/");
    assert_eq!(h.widget.media_requests.len(), 1);
    let media = h.fetcher.last();
    assert_eq!(media.url, "gemini://example.org/pic.png");

    media.header(StatusCode::SUCCESS, "image/png");
    h.pump();
    assert!(h.widget.media_progress(1).is_some());
    assert!(!h.widget.document().media().has_content(1));
    media.body(b"png bytes");
    media.finish();
    h.pump();

    let doc = h.widget.document();
    assert!(doc.media().data(1).is_some());
    assert!(doc.link(1).unwrap().flags.contains(LinkFlags::CONTENT));
    assert!(!doc.link(1).unwrap().flags.contains(LinkFlags::PERMANENT));
    assert!(doc.runs().iter().any(|r| r.image_id.is_some()));
    assert_eq!(h.widget.media_progress(1), None);

    let pos = link_label_pos(&h, 1);
    left_click(&mut h, pos);
    let doc = h.widget.document();
    assert!(!doc.media().has_content(1));
    assert!(!doc.link(1).unwrap().flags.contains(LinkFlags::CONTENT));
    assert!(doc.runs().iter().all(|r| r.image_id.is_none()));

    // Shown again from the finished download.
    let pos = link_label_pos(&h, 1);
    left_click(&mut h, pos);
    assert!(h.widget.document().media().has_content(1));
    assert_eq!(h.fetcher.count(), 2);
}

#[test]
fn failed_media_request_reports_and_is_dropped() {
    let mut h = Harness::new();
    h.load_gemtext(
        "gemini://example.org/",
        "=> gemini://example.org/gone.png Gone\n",
    );
    h.widget.take_events();
    assert!(h.widget.request_media(1));
    assert!(!h.widget.request_media(1));
    h.fetcher
        .last()
        .respond(StatusCode::NOT_FOUND, "no such file", b"");
    h.pump();

    assert!(h.widget.media_requests.is_empty());
    assert!(!h.widget.document().media().has_content(1));
    let events = h.widget.take_events();
    assert!(events.iter().any(|e| matches!(e, DocumentEvent::Message(_))));
    assert_eq!(h.widget.url(), "gemini://example.org/");
}

#[test]
fn streaming_audio_gets_a_player_before_it_finishes() {
    let mut h = Harness::new();
    h.load_gemtext(
        "gemini://example.org/",
        "# Music\n=> gemini://example.org/song.ogg Song\n",
    );
    assert!(h.widget.request_media(1));
    let media = h.fetcher.last();
    media.header(StatusCode::SUCCESS, "audio/ogg");
    media.body(b"OggS partial");
    h.pump();

    let id = h.widget.document().media().find_audio(1).expect("audio registered");
    assert!(h.widget.document().media().player(id).unwrap().is_streaming());
    assert!(h.widget.document().runs().iter().any(|r| r.audio_id == Some(id)));

    media.body(b" and the rest");
    media.finish();
    h.pump();
    let media = h.widget.document().media();
    let id = media.find_audio(1).unwrap();
    assert!(!media.player(id).unwrap().is_streaming());
    assert_eq!(media.data(1).map(|(mime, _)| mime), Some("audio/ogg"));
}
