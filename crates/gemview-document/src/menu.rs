//! Context menus.
//!
//! Built from a description of what is under the pointer; the host shows
//! the items and sends back the chosen item's [`Command`].

use crate::classify::SAVE_SHORTCUT;
use crate::commands::Command;
use crate::events::OpenMode;
use crate::layout::LinkId;

const SEPARATOR: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub shortcut: Option<&'static str>,
    /// `None` for separators and informational items.
    pub command: Option<Command>,
}

impl MenuItem {
    pub fn new(label: &str, command: Command) -> Self {
        Self {
            label: label.to_string(),
            shortcut: None,
            command: Some(command),
        }
    }

    pub fn with_shortcut(mut self, shortcut: &'static str) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    /// An item that does nothing when chosen.
    pub fn info(label: &str) -> Self {
        Self {
            label: label.to_string(),
            shortcut: None,
            command: None,
        }
    }

    pub fn separator() -> Self {
        Self::info(SEPARATOR)
    }

    pub fn is_separator(&self) -> bool {
        self.command.is_none() && self.label == SEPARATOR
    }
}

/// The link a menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
    pub id: LinkId,
    pub scheme: String,
    /// Opening goes through a configured proxy.
    pub proxied: bool,
    /// The link's inline media has finished downloading.
    pub media_ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuContext {
    pub link: Option<LinkContext>,
    pub has_selection: bool,
}

/// Schemes the viewer opens itself.
fn is_native(scheme: &str) -> bool {
    matches!(scheme, "gemini" | "gopher" | "about" | "file" | "data")
}

fn link_items(link: &LinkContext) -> Vec<MenuItem> {
    let open = |label: &str, mode: OpenMode| {
        MenuItem::new(label, Command::OpenLink {
            link: link.id,
            mode,
        })
    };
    let mut items = Vec::new();
    if is_native(&link.scheme) || link.proxied {
        items.push(open("Open Link in New Tab", OpenMode::NewTab));
        items.push(open("Open Link in Background Tab", OpenMode::BackgroundTab));
    } else {
        items.push(open("Open Link in Default Browser", OpenMode::DefaultBrowser));
    }
    if link.proxied {
        items.push(MenuItem::separator());
        if link.scheme == "gemini" {
            items.push(open("Open without Proxy", OpenMode::NoProxy));
        } else {
            items.push(open("Open Link in Default Browser", OpenMode::DefaultBrowser));
        }
    }
    items.push(MenuItem::separator());
    items.push(MenuItem::new("Copy Link", Command::CopyLink(link.id)));
    if link.media_ready {
        items.push(MenuItem::new("Save to Downloads", Command::SaveMedia(link.id)));
    }
    items
}

fn page_items(has_selection: bool) -> Vec<MenuItem> {
    let mut items = Vec::new();
    if has_selection {
        items.push(MenuItem::new("Copy", Command::Copy).with_shortcut("Ctrl+C"));
        items.push(MenuItem::separator());
    }
    items.extend([
        MenuItem::new("Go Back", Command::NavigateBack),
        MenuItem::new("Go Forward", Command::NavigateForward),
        MenuItem::new("Go to Parent", Command::NavigateParent),
        MenuItem::new("Go to Root", Command::NavigateRoot),
        MenuItem::separator(),
        MenuItem::new("Reload Page", Command::Reload).with_shortcut("Ctrl+R"),
        MenuItem::separator(),
        MenuItem::new("Copy Page URL", Command::CopyPageUrl),
    ]);
    if !has_selection {
        items.push(MenuItem::new("Copy Page Source", Command::CopyPageSource));
        items.push(MenuItem::new("Save to Downloads", Command::Save).with_shortcut(SAVE_SHORTCUT));
    }
    items
}

/// Items for a right click.
pub fn context_menu(ctx: &MenuContext) -> Vec<MenuItem> {
    match &ctx.link {
        Some(link) => link_items(link),
        None => page_items(ctx.has_selection),
    }
}

/// Menu of an audio player's menu button.
pub fn player_menu(label: &str) -> Vec<MenuItem> {
    vec![MenuItem::info(label)]
}
