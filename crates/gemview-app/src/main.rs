//! Terminal driver for the gemview document widget.
//!
//! Opens a Gemini URL or a local file, prints the visible part of the page
//! as text, and then reads widget commands (`scroll.page 1`,
//! `find.next word`, `document.open link:2`, ...) from stdin, one per line.
//! `open <url>` navigates, `quit` exits.

mod args;
mod text_canvas;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use args::Args;
use gemview_document::events::Notification;
use gemview_document::focus::FocusRegistry;
use gemview_document::{Command, DocumentConfig, DocumentEvent, DocumentWidget, NetFetcher, Services};
use gemview_net::certs::{CertStore, MemoryCertStore};
use gemview_net::transport::Transport;
use gemview_types::geometry::{Int2, Rect};
use gemview_ui::clock::{Clock, SystemClock};
use text_canvas::TextCanvas;

/// How long to wait for a page before printing what has arrived.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const FRAME: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DocumentConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DocumentConfig::default(),
    };
    log::info!("Starting gemview ({}x{})", args.width, args.height);

    let certs = Arc::new(match &args.certs {
        Some(path) if path.exists() => MemoryCertStore::load(path)?,
        _ => MemoryCertStore::new(),
    });
    let (tx, rx) = mpsc::channel();
    let cert_store: Arc<dyn CertStore> = Arc::clone(&certs) as Arc<dyn CertStore>;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let fetcher = NetFetcher::new(transport(), Arc::clone(&cert_store));
    let services = Services {
        fetcher: Arc::new(fetcher),
        certs: cert_store,
        focus: FocusRegistry::new(),
        clock,
        notify: tx,
    };

    let mut widget = DocumentWidget::new(config, services);
    widget.activate();
    widget.set_bounds(Rect::new(0, 0, args.width, args.height));
    let mut canvas = TextCanvas::new(Int2::new(args.width, args.height));

    widget.open(&target_url(&args.target)?);
    settle(&mut widget, &rx);
    show(&mut widget, &mut canvas)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {},
        }
        if let Some(url) = line.strip_prefix("open ") {
            widget.open(url.trim());
        } else {
            match Command::parse(line) {
                Some(cmd) => {
                    if !widget.handle_command(&cmd) {
                        println!("! {cmd} not available");
                    }
                },
                None => println!("! unknown command: {line}"),
            }
        }
        settle(&mut widget, &rx);
        show(&mut widget, &mut canvas)?;
    }

    if let Some(path) = &args.certs {
        certs.save(path)?;
    }
    Ok(())
}

#[cfg(feature = "tls")]
fn transport() -> Arc<dyn Transport> {
    Arc::new(gemview_net::tls::RustlsTransport::new())
}

#[cfg(not(feature = "tls"))]
fn transport() -> Arc<dyn Transport> {
    log::warn!("built without TLS: only file:// URLs can be opened");
    Arc::new(gemview_net::transport::MemoryTransport::new())
}

/// Local paths become `file://` URLs.
fn target_url(target: &str) -> Result<String> {
    if target.contains("://") || target.starts_with("about:") {
        return Ok(target.to_string());
    }
    let path = Path::new(target)
        .canonicalize()
        .with_context(|| format!("cannot open {target}"))?;
    Ok(format!("file://{}", path.display()))
}

/// Deliver notifications until the request is done and animations have
/// stopped.
fn settle(widget: &mut DocumentWidget, rx: &Receiver<Notification>) {
    let mut waited = Duration::ZERO;
    while widget.is_request_ongoing() || widget.needs_frame() {
        match rx.recv_timeout(FRAME) {
            Ok(n) => {
                widget.handle_notification(n);
                while let Ok(n) = rx.try_recv() {
                    widget.handle_notification(n);
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => waited += FRAME,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        widget.frame();
        if waited >= LOAD_TIMEOUT {
            log::warn!("gave up waiting for {}", widget.url());
            break;
        }
    }
}

fn show(widget: &mut DocumentWidget, canvas: &mut TextCanvas) -> Result<()> {
    for event in widget.take_events() {
        report(&event);
    }
    widget.draw(canvas)?;
    let mut out = io::stdout().lock();
    writeln!(out, "--- {} [{}]", widget.window_title(), widget.url())?;
    for line in canvas.take_lines() {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "--- {}/{}", widget.scroll_y(), widget.scroll_max())?;
    out.flush()?;
    Ok(())
}

fn report(event: &DocumentEvent) {
    match event {
        DocumentEvent::InputRequested { prompt, sensitive, .. } => {
            let kind = if *sensitive { "sensitive input" } else { "input" };
            println!("? {kind}: {prompt}");
            println!("  answer with: document.input.submit <text>");
        },
        DocumentEvent::Open { url, mode } => println!("> open {url} ({mode:?})"),
        DocumentEvent::Clipboard(text) => println!("> clipboard:\n{text}"),
        DocumentEvent::Message(text) => println!("! {}", text.replace('\n', ": ")),
        DocumentEvent::ContextMenu(items) => {
            for item in items.iter().filter(|i| !i.is_separator()) {
                match &item.command {
                    Some(cmd) => println!("  {:<28} {cmd}", item.label),
                    None => println!("  {}", item.label),
                }
            }
        },
        other => log::debug!("{}", other.name()),
    }
}
