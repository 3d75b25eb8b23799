//! Mouse, wheel and keyboard handling.

use gemview_net::Url;
use gemview_types::geometry::Int2;
use gemview_types::input::{InputEvent, Key, Modifiers, MouseButton, WheelClass};
use gemview_ui::click::ClickResult;

use super::player_ui::PlayerUi;
use super::{CursorShape, DocumentWidget, GrabbedPlayer, RequestState};
use crate::events::{DocumentEvent, OpenMode};
use crate::layout::{LinkFlags, LinkId};
use crate::mark::Mark;
use crate::media::PlayerFlags;
use crate::menu::{LinkContext, MenuContext, context_menu, player_menu};
use crate::ordinal::ordinal_from_key;

/// How a click with `mods` opens a link.
fn open_mode_for(mods: Modifiers) -> OpenMode {
    match (mods.primary, mods.shift) {
        (true, true) => OpenMode::NewTab,
        (true, false) => OpenMode::BackgroundTab,
        _ => OpenMode::Current,
    }
}

impl DocumentWidget {
    /// Handle an input event. Returns true when the event was used.
    pub fn handle_input(&mut self, ev: &InputEvent) -> bool {
        match *ev {
            InputEvent::Wheel {
                delta, pos, class, ..
            } => {
                if !self.bounds.contains(pos) {
                    return false;
                }
                self.handle_wheel(delta, pos, class);
                return true;
            },
            InputEvent::MouseMove { pos, .. } => self.on_mouse_move(pos),
            InputEvent::KeyDown { key, mods, repeat } => return self.handle_key(key, mods, repeat),
            InputEvent::KeyUp { .. } => {
                if self.link_keys.is_some_and(|k| k.release) {
                    self.exit_link_keys();
                }
                return false;
            },
            InputEvent::MouseDown {
                button: MouseButton::Middle,
                pos,
                ..
            } if self.bounds.contains(pos) => {
                if let Some(link) = self.hover_link {
                    self.open_link(link, OpenMode::NewTab);
                }
                return true;
            },
            InputEvent::MouseDown {
                button: MouseButton::Right,
                pos,
                ..
            } if self.bounds.contains(pos) => {
                self.open_context_menu();
                return true;
            },
            _ => {},
        }
        if self.process_player_event(ev) {
            return true;
        }
        self.process_click(ev)
    }

    fn handle_wheel(&mut self, delta: Int2, pos: Int2, class: WheelClass) {
        let now = self.now();
        match class {
            WheelClass::Precise => {
                self.scroll.stop(now);
                if delta.x.abs() > delta.y.abs() {
                    if !self.selecting {
                        self.scroll_wide_block(pos, -delta.x, 0);
                    }
                } else {
                    self.smooth_scroll(-delta.y, 0);
                }
            },
            WheelClass::Stepped => {
                let lh = self.line_height();
                if delta.x != 0 && !self.selecting {
                    let duration = self.config.wide_scroll_duration_ms;
                    self.scroll_wide_block(pos, -3 * delta.x * lh, duration);
                }
                if delta.y != 0 {
                    let mut duration = self.config.smooth_duration_ms;
                    if !self.scroll.is_finished(now) && self.scroll.pos(now) < 0.25 {
                        // Keep up with a fast-spinning wheel.
                        duration /= 2;
                    }
                    self.smooth_scroll(-3 * delta.y * lh, duration);
                }
            },
        }
    }

    fn on_mouse_move(&mut self, pos: Int2) {
        self.no_hover_while_scrolling = false;
        self.update_hover(pos);
        let over_banner = self
            .doc
            .site_banner()
            .map(|b| self.view_rect(b.vis_bounds))
            .is_some_and(|r| r.contains(pos));
        if over_banner {
            self.cursor = CursorShape::Hand;
        }
        self.update_outline_opacity();
    }

    // -------------------------------------------------------------------
    // Links
    // -------------------------------------------------------------------

    /// Open link `id` in the given mode. Links the viewer cannot open itself
    /// go to the default browser.
    pub fn open_link(&mut self, id: LinkId, mode: OpenMode) {
        let Some(link) = self.doc.link(id) else {
            return;
        };
        let url = link.url.clone();
        let scheme = Url::parse(&url).map(|u| u.scheme).unwrap_or_default();
        let native = link.flags.contains(LinkFlags::SUPPORTED_PROTOCOL)
            || self.config.will_use_proxy(&scheme);
        log::debug!("session {}: open link {id} ({mode:?})", self.session.0);
        match mode {
            OpenMode::Current if native => self.open(&url),
            OpenMode::Current => self.emit(DocumentEvent::Open {
                url,
                mode: OpenMode::DefaultBrowser,
            }),
            mode => self.emit(DocumentEvent::Open { url, mode }),
        }
    }

    /// Click on link `id`: media links toggle their inline content, other
    /// links open. Permanent content does nothing.
    fn activate_link(&mut self, id: LinkId, mode: OpenMode) {
        let Some(flags) = self.doc.link(id).map(|l| l.flags) else {
            return;
        };
        if flags.contains(LinkFlags::CONTENT | LinkFlags::PERMANENT) {
            return;
        }
        let is_media = flags.is_media() && !flags.contains(LinkFlags::SELF_LINK);
        if is_media && mode == OpenMode::Current {
            self.toggle_media(id);
        } else {
            self.open_link(id, mode);
        }
    }

    fn open_context_menu(&mut self) {
        self.context_link = self.hover_link;
        let link = self.context_link.and_then(|id| {
            let link = self.doc.link(id)?;
            let scheme = Url::parse(&link.url).map(|u| u.scheme).unwrap_or_default();
            let media_ready = self.doc.media().data(id).is_some()
                || self
                    .media_request_index(id)
                    .is_some_and(|i| self.media_requests[i].session.is_finished());
            Some(LinkContext {
                id,
                proxied: self.config.will_use_proxy(&scheme),
                scheme,
                media_ready,
            })
        });
        let items = context_menu(&MenuContext {
            link,
            has_selection: self.selection().is_some(),
        });
        self.emit(DocumentEvent::ContextMenu(items));
    }

    // -------------------------------------------------------------------
    // Players
    // -------------------------------------------------------------------

    fn process_player_event(&mut self, ev: &InputEvent) -> bool {
        let (pos, down) = match *ev {
            InputEvent::MouseDown {
                button: MouseButton::Left,
                pos,
                ..
            } => (pos, true),
            InputEvent::MouseUp {
                button: MouseButton::Left,
                pos,
                ..
            } => (pos, false),
            _ => return false,
        };
        if self.grabbed_player.is_some() {
            return false;
        }
        let hit = self.visible.players.iter().find_map(|&key| {
            let run = self.doc.run(key)?;
            let rect = self.view_rect(run.bounds);
            rect.contains(pos).then_some((key, run.audio_id?, rect))
        });
        let Some((key, id, rect)) = hit else {
            return false;
        };
        let now = self.now();
        let ui = PlayerUi::new(rect, self.config.gap);
        let Some(player) = self.doc.media_mut().player_mut(id) else {
            return false;
        };
        self.needs_redraw = true;
        if down {
            if player.flags.contains(PlayerFlags::ADJUSTING_VOLUME) && ui.volume_grab_area().contains(pos) {
                player.flags |= PlayerFlags::VOLUME_GRABBED;
                let start_volume = player.volume();
                self.grabbed_player = Some(GrabbedPlayer {
                    run: key,
                    id,
                    start_volume,
                });
                self.click.process(ev, self.bounds);
            }
            return true;
        }
        if ui.play_pause.contains(pos) {
            let resume = !player.is_playing();
            player.toggle(now);
            if resume {
                for (other, p) in self.doc.media_mut().players_mut() {
                    if other != id {
                        p.set_paused(true, now);
                    }
                }
            }
            self.animate_players();
        } else if ui.rewind.contains(pos) {
            player.rewind(now);
        } else if ui.volume.contains(pos) {
            player.toggle_volume_ui(now);
            self.animate_players();
        } else if ui.menu.contains(pos) {
            let items = player_menu(&player.label());
            self.emit(DocumentEvent::ContextMenu(items));
        }
        true
    }

    fn drag_volume(&mut self, grabbed: GrabbedPlayer) {
        let Some(rect) = self.doc.run(grabbed.run).map(|r| self.view_rect(r.bounds)) else {
            return;
        };
        let ui = PlayerUi::new(rect, self.config.gap);
        let dx = self.click.pos().x - self.click.start_pos().x;
        let now = self.now();
        if let Some(player) = self.doc.media_mut().player_mut(grabbed.id) {
            player.set_volume(grabbed.start_volume + dx as f32 / ui.volume_slider.width() as f32);
            player.last_interaction_ms = now;
        }
        self.needs_redraw = true;
    }

    fn release_player(&mut self) -> bool {
        let Some(grabbed) = self.grabbed_player.take() else {
            return false;
        };
        let now = self.now();
        if let Some(player) = self.doc.media_mut().player_mut(grabbed.id) {
            player.flags.remove(PlayerFlags::VOLUME_GRABBED);
            player.last_interaction_ms = now;
        }
        self.animate_players();
        self.needs_redraw = true;
        true
    }

    // -------------------------------------------------------------------
    // Left button
    // -------------------------------------------------------------------

    fn process_click(&mut self, ev: &InputEvent) -> bool {
        match self.click.process(ev, self.bounds) {
            ClickResult::None => false,
            ClickResult::Started | ClickResult::Double => {
                self.selecting = false;
                true
            },
            ClickResult::Drag => {
                if let Some(grabbed) = self.grabbed_player {
                    self.drag_volume(grabbed);
                    return true;
                }
                self.extend_selection();
                true
            },
            ClickResult::Finished => {
                self.selecting = false;
                if self.release_player() {
                    return true;
                }
                if self.click.is_moved() {
                    return true;
                }
                let mods = match *ev {
                    InputEvent::MouseUp { mods, .. } => mods,
                    _ => Modifiers::NONE,
                };
                self.click_without_drag(mods);
                true
            },
            ClickResult::Aborted => {
                self.selecting = false;
                self.release_player();
                true
            },
        }
    }

    fn extend_selection(&mut self) {
        if matches!(self.state, RequestState::Blank | RequestState::Fetching) {
            return;
        }
        if !self.selecting {
            self.reset_wide_runs();
            self.selecting = true;
            let start = self.document_pos(self.click.start_pos());
            self.select_mark = self.doc.find_loc(start).map(Mark::at);
        }
        let end = self.document_pos(self.click.pos());
        if let (Some(mark), Some(loc)) = (self.select_mark.as_mut(), self.doc.find_loc(end)) {
            mark.end = loc;
        }
        self.needs_redraw = true;
    }

    fn click_without_drag(&mut self, mods: Modifiers) {
        let pos = self.click.pos();
        let on_banner = self
            .doc
            .site_banner()
            .map(|b| self.view_rect(b.vis_bounds))
            .is_some_and(|r| r.contains(pos));
        if on_banner {
            self.navigate_root();
            return;
        }
        if let Some(link) = self.hover_link {
            self.activate_link(link, open_mode_for(mods));
        }
        if self.select_mark.take().is_some() {
            self.needs_redraw = true;
        }
    }

    // -------------------------------------------------------------------
    // Keyboard
    // -------------------------------------------------------------------

    fn handle_key(&mut self, key: Key, mods: Modifiers, repeat: bool) -> bool {
        if let Some(keys) = self.link_keys {
            match key {
                Key::Escape => {
                    self.exit_link_keys();
                    return true;
                },
                Key::Char(c) => {
                    let ord = ordinal_from_key(keys.mode, c, self.config.reserve_platform_keys);
                    let link = ord.and_then(|o| {
                        self.visible.ordinal_links(&*self.doc, self.ordinal_skip()).get(o).copied()
                    });
                    if let Some(link) = link {
                        self.exit_link_keys();
                        self.open_link(link, open_mode_for(mods));
                    }
                    return true;
                },
                _ => {},
            }
        }
        match key {
            Key::PageUp => self.scroll_page(-1, repeat),
            Key::PageDown => self.scroll_page(1, repeat),
            Key::Space => self.scroll_page(if mods.shift { -1 } else { 1 }, repeat),
            Key::Up => self.scroll_step(-1, repeat),
            Key::Down => self.scroll_step(1, repeat),
            Key::Home => self.scroll_top(),
            Key::End => self.scroll_bottom(),
            Key::Char('c') if mods.primary => self.copy(),
            Key::Escape if self.select_mark.is_some() => {
                self.select_mark = None;
                self.needs_redraw = true;
            },
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_pick_open_mode() {
        assert_eq!(open_mode_for(Modifiers::NONE), OpenMode::Current);
        let primary = Modifiers {
            primary: true,
            ..Modifiers::NONE
        };
        assert_eq!(open_mode_for(primary), OpenMode::BackgroundTab);
        let both = Modifiers {
            shift: true,
            ..primary
        };
        assert_eq!(open_mode_for(both), OpenMode::NewTab);
    }
}
