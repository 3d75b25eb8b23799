//! Commands the document widget reacts to.
//!
//! Each command has a dotted textual form (`scroll.page 1`,
//! `find.next word`, `document.open link:3 newtab`) so hosts, menus and the
//! headless driver can all speak the same language.

use std::fmt;

use crate::events::OpenMode;
use crate::layout::LinkId;
use crate::ordinal::OrdinalMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reload,
    Stop,
    /// Save the page to the downloads directory.
    Save,
    NavigateBack,
    NavigateForward,
    NavigateParent,
    NavigateRoot,
    /// Half a viewport per unit; negative scrolls up.
    ScrollPage(i32),
    /// Three lines per unit.
    ScrollStep(i32),
    ScrollTop,
    ScrollBottom,
    FindNext(String),
    FindPrev(String),
    FindClearMark,
    /// Enter link-key mode. With `release` the mode ends as soon as the
    /// modifier that started it is let go.
    LinkKeys { mode: OrdinalMode, release: bool },
    InputSubmit(String),
    InputCancel,
    /// Selection, or the whole source when nothing is selected.
    Copy,
    CopyPageUrl,
    CopyPageSource,
    CopyLink(LinkId),
    OpenLink { link: LinkId, mode: OpenMode },
    ShowCert,
    TrustCert,
    /// Save the inline media of a link.
    SaveMedia(LinkId),
}

fn link_arg(arg: Option<&str>) -> Option<LinkId> {
    arg?.strip_prefix("link:")?.parse().ok().filter(|&id| id > 0)
}

fn open_mode_name(mode: OpenMode) -> &'static str {
    match mode {
        OpenMode::Current => "current",
        OpenMode::NewTab => "newtab",
        OpenMode::BackgroundTab => "bgtab",
        OpenMode::DefaultBrowser => "browser",
        OpenMode::NoProxy => "noproxy",
    }
}

fn parse_open_mode(s: Option<&str>) -> Option<OpenMode> {
    Some(match s.unwrap_or("current") {
        "current" => OpenMode::Current,
        "newtab" => OpenMode::NewTab,
        "bgtab" => OpenMode::BackgroundTab,
        "browser" => OpenMode::DefaultBrowser,
        "noproxy" => OpenMode::NoProxy,
        _ => return None,
    })
}

impl Command {
    /// Parse the textual form. Unknown names and malformed arguments give
    /// `None`.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        let (name, rest) = match input.split_once(char::is_whitespace) {
            Some((n, r)) => (n, r.trim()),
            None => (input, ""),
        };
        let mut args = rest.split_whitespace();
        let amount = |rest: &str| -> Option<i32> {
            if rest.is_empty() { Some(1) } else { rest.parse().ok() }
        };
        let cmd = match name {
            "document.reload" => Command::Reload,
            "document.stop" => Command::Stop,
            "document.save" => Command::Save,
            "navigate.back" => Command::NavigateBack,
            "navigate.forward" => Command::NavigateForward,
            "navigate.parent" => Command::NavigateParent,
            "navigate.root" => Command::NavigateRoot,
            "scroll.page" => Command::ScrollPage(amount(rest)?),
            "scroll.step" => Command::ScrollStep(amount(rest)?),
            "scroll.top" => Command::ScrollTop,
            "scroll.bottom" => Command::ScrollBottom,
            "find.next" if !rest.is_empty() => Command::FindNext(rest.to_string()),
            "find.prev" if !rest.is_empty() => Command::FindPrev(rest.to_string()),
            "find.clearmark" => Command::FindClearMark,
            "document.linkkeys" => {
                let mut mode = OrdinalMode::NumbersAndAlphabet;
                let mut release = false;
                for arg in args {
                    match arg {
                        "homerow" => mode = OrdinalMode::HomeRow,
                        "release" => release = true,
                        _ => return None,
                    }
                }
                Command::LinkKeys { mode, release }
            },
            "document.input.submit" => Command::InputSubmit(rest.to_string()),
            "document.input.cancel" => Command::InputCancel,
            "copy" => Command::Copy,
            "document.copyurl" => Command::CopyPageUrl,
            "document.copysource" => Command::CopyPageSource,
            "document.copylink" => Command::CopyLink(link_arg(args.next())?),
            "document.open" => {
                let link = link_arg(args.next())?;
                let mode = parse_open_mode(args.next())?;
                Command::OpenLink { link, mode }
            },
            "server.showcert" => Command::ShowCert,
            "server.trustcert" => Command::TrustCert,
            "media.save" => Command::SaveMedia(link_arg(args.next())?),
            _ => return None,
        };
        Some(cmd)
    }

    /// The dotted name without arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Reload => "document.reload",
            Command::Stop => "document.stop",
            Command::Save => "document.save",
            Command::NavigateBack => "navigate.back",
            Command::NavigateForward => "navigate.forward",
            Command::NavigateParent => "navigate.parent",
            Command::NavigateRoot => "navigate.root",
            Command::ScrollPage(_) => "scroll.page",
            Command::ScrollStep(_) => "scroll.step",
            Command::ScrollTop => "scroll.top",
            Command::ScrollBottom => "scroll.bottom",
            Command::FindNext(_) => "find.next",
            Command::FindPrev(_) => "find.prev",
            Command::FindClearMark => "find.clearmark",
            Command::LinkKeys { .. } => "document.linkkeys",
            Command::InputSubmit(_) => "document.input.submit",
            Command::InputCancel => "document.input.cancel",
            Command::Copy => "copy",
            Command::CopyPageUrl => "document.copyurl",
            Command::CopyPageSource => "document.copysource",
            Command::CopyLink(_) => "document.copylink",
            Command::OpenLink { .. } => "document.open",
            Command::ShowCert => "server.showcert",
            Command::TrustCert => "server.trustcert",
            Command::SaveMedia(_) => "media.save",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Command::ScrollPage(n) | Command::ScrollStep(n) => write!(f, " {n}"),
            Command::FindNext(s) | Command::FindPrev(s) => write!(f, " {s}"),
            Command::InputSubmit(s) if !s.is_empty() => write!(f, " {s}"),
            Command::LinkKeys { mode, release } => {
                if *mode == OrdinalMode::HomeRow {
                    f.write_str(" homerow")?;
                }
                if *release {
                    f.write_str(" release")?;
                }
                Ok(())
            },
            Command::CopyLink(id) | Command::SaveMedia(id) => write!(f, " link:{id}"),
            Command::OpenLink { link, mode } => {
                write!(f, " link:{link} {}", open_mode_name(*mode))
            },
            _ => Ok(()),
        }
    }
}
