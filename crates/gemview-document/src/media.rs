//! Inline media attached to links: images and audio players.
//!
//! Media is keyed by the link whose target produced it. The audio engine
//! itself is external; [`Player`] models the state the widget draws and
//! controls.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

use bitflags::bitflags;
use gemview_types::geometry::Int2;

use crate::events::{Notification, SessionId};
use crate::layout::LinkId;

/// Media entry index. Numbering starts from 1.
pub type MediaId = u32;

/// Size used for images whose dimensions cannot be read.
pub const PLACEHOLDER_IMAGE_SIZE: Int2 = Int2::new(160, 120);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MediaFlags: u8 {
        /// More data is still arriving.
        const PARTIAL_DATA = 1 << 0;
        /// The user may hide the content again.
        const ALLOW_HIDE = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    pub link: LinkId,
    pub mime: String,
    pub data: Vec<u8>,
    pub size: Int2,
    pub partial: bool,
    pub permanent: bool,
}

#[derive(Debug, Clone)]
pub struct AudioEntry {
    pub link: LinkId,
    pub mime: String,
    pub data_len: usize,
    pub data: Vec<u8>,
    pub partial: bool,
    pub permanent: bool,
    pub player: Player,
}

/// Media registry of one document.
#[derive(Debug, Default, Clone)]
pub struct Media {
    images: Vec<(MediaId, ImageEntry)>,
    audio: Vec<(MediaId, AudioEntry)>,
    next_id: MediaId,
}

impl Media {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.audio.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.audio.is_empty()
    }

    fn alloc_id(&mut self) -> MediaId {
        self.next_id += 1;
        self.next_id
    }

    /// Set, update or remove (`mime` of `None`) the media of `link`.
    ///
    /// Returns the entry id, or `None` when the entry was removed or the
    /// MIME type is neither image nor audio.
    pub fn set_data(
        &mut self,
        link: LinkId,
        mime: Option<&str>,
        data: &[u8],
        flags: MediaFlags,
    ) -> Option<MediaId> {
        let Some(mime) = mime.filter(|m| !m.is_empty()) else {
            self.images.retain(|(_, e)| e.link != link);
            self.audio.retain(|(_, e)| e.link != link);
            return None;
        };
        let partial = flags.contains(MediaFlags::PARTIAL_DATA);
        let permanent = !flags.contains(MediaFlags::ALLOW_HIDE);
        if mime.starts_with("image/") {
            let size = if partial {
                PLACEHOLDER_IMAGE_SIZE
            } else {
                image_dimensions(data).unwrap_or(PLACEHOLDER_IMAGE_SIZE)
            };
            let entry = ImageEntry {
                link,
                mime: mime.to_string(),
                data: data.to_vec(),
                size,
                partial,
                permanent,
            };
            if let Some((id, existing)) = self.images.iter_mut().find(|(_, e)| e.link == link) {
                *existing = entry;
                return Some(*id);
            }
            let id = self.alloc_id();
            self.images.push((id, entry));
            return Some(id);
        }
        if mime.starts_with("audio/") {
            if let Some((id, existing)) = self.audio.iter_mut().find(|(_, e)| e.link == link) {
                existing.data = data.to_vec();
                existing.data_len = data.len();
                existing.partial = partial;
                existing.player.set_streaming(partial);
                return Some(*id);
            }
            let id = self.alloc_id();
            let mut player = Player::new(mime);
            player.set_streaming(partial);
            self.audio.push((id, AudioEntry {
                link,
                mime: mime.to_string(),
                data_len: data.len(),
                data: data.to_vec(),
                partial,
                permanent,
                player,
            }));
            return Some(id);
        }
        log::debug!("media for link {link} has unsupported type {mime}");
        None
    }

    pub fn find_image(&self, link: LinkId) -> Option<MediaId> {
        self.images.iter().find(|(_, e)| e.link == link).map(|(id, _)| *id)
    }

    pub fn find_audio(&self, link: LinkId) -> Option<MediaId> {
        self.audio.iter().find(|(_, e)| e.link == link).map(|(id, _)| *id)
    }

    pub fn image(&self, id: MediaId) -> Option<&ImageEntry> {
        self.images.iter().find(|(i, _)| *i == id).map(|(_, e)| e)
    }

    pub fn audio(&self, id: MediaId) -> Option<&AudioEntry> {
        self.audio.iter().find(|(i, _)| *i == id).map(|(_, e)| e)
    }

    pub fn player(&self, id: MediaId) -> Option<&Player> {
        self.audio(id).map(|e| &e.player)
    }

    pub fn player_mut(&mut self, id: MediaId) -> Option<&mut Player> {
        self.audio
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, e)| &mut e.player)
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = (MediaId, &mut Player)> {
        self.audio.iter_mut().map(|(id, e)| (*id, &mut e.player))
    }

    /// Whether `link` has media attached.
    pub fn has_content(&self, link: LinkId) -> bool {
        self.find_image(link).is_some() || self.find_audio(link).is_some()
    }

    /// Whether the media of `link` cannot be hidden.
    pub fn is_permanent(&self, link: LinkId) -> bool {
        self.images.iter().any(|(_, e)| e.link == link && e.permanent)
            || self.audio.iter().any(|(_, e)| e.link == link && e.permanent)
    }

    /// MIME type and bytes of the media attached to `link`.
    pub fn data(&self, link: LinkId) -> Option<(&str, &[u8])> {
        if let Some((_, e)) = self.images.iter().find(|(_, e)| e.link == link) {
            return Some((&e.mime, &e.data));
        }
        self.audio
            .iter()
            .find(|(_, e)| e.link == link)
            .map(|(_, e)| (e.mime.as_str(), e.data.as_slice()))
    }
}

/// Pixel dimensions of an encoded image, if the format is recognized.
pub fn image_dimensions(data: &[u8]) -> Option<Int2> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    let (w, h) = reader.into_dimensions().ok()?;
    Some(Int2::new(w as i32, h as i32))
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PlayerFlags: u8 {
        /// The volume slider is shown.
        const ADJUSTING_VOLUME = 1 << 0;
        /// The volume slider is being dragged.
        const VOLUME_GRABBED = 1 << 1;
    }
}

/// Playback state of one inline audio player.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    mime: String,
    started: bool,
    paused: bool,
    volume: f32,
    played_ms: u64,
    resumed_at: Option<u64>,
    streaming: bool,
    pub flags: PlayerFlags,
    /// Time of the last volume interaction.
    pub last_interaction_ms: u64,
    pub metadata: Option<String>,
}

impl Player {
    pub fn new(mime: &str) -> Self {
        Self {
            mime: mime.to_string(),
            started: false,
            paused: false,
            volume: 1.0,
            played_ms: 0,
            resumed_at: None,
            streaming: false,
            flags: PlayerFlags::empty(),
            last_interaction_ms: 0,
            metadata: None,
        }
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_playing(&self) -> bool {
        self.started && !self.paused
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn start(&mut self, now: u64) {
        self.started = true;
        self.paused = false;
        self.resumed_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.started = false;
        self.paused = false;
        self.played_ms = 0;
        self.resumed_at = None;
    }

    pub fn set_paused(&mut self, paused: bool, now: u64) {
        if !self.started || self.paused == paused {
            return;
        }
        if paused {
            if let Some(t) = self.resumed_at.take() {
                self.played_ms += now.saturating_sub(t);
            }
        } else {
            self.resumed_at = Some(now);
        }
        self.paused = paused;
    }

    /// Start, or flip between paused and playing.
    pub fn toggle(&mut self, now: u64) {
        if self.started {
            self.set_paused(!self.paused, now);
        } else {
            self.start(now);
        }
    }

    /// Seconds played.
    pub fn time(&self, now: u64) -> f64 {
        let running = self.resumed_at.map_or(0, |t| now.saturating_sub(t));
        (self.played_ms + running) as f64 / 1000.0
    }

    /// Back to the start, paused. Does nothing within the first half
    /// second.
    pub fn rewind(&mut self, now: u64) {
        if self.time(now) > 0.5 {
            self.stop();
            self.start(now);
            self.set_paused(true, now);
        }
    }

    /// Show or hide the volume slider.
    pub fn toggle_volume_ui(&mut self, now: u64) {
        self.flags.toggle(PlayerFlags::ADJUSTING_VOLUME);
        self.last_interaction_ms = now;
    }

    /// Hide the volume slider once it has been idle for `idle_ms`.
    /// Returns true when the slider was hidden.
    pub fn expire_volume_ui(&mut self, now: u64, idle_ms: u64) -> bool {
        if self.flags.contains(PlayerFlags::ADJUSTING_VOLUME)
            && !self.flags.contains(PlayerFlags::VOLUME_GRABBED)
            && now.saturating_sub(self.last_interaction_ms) >= idle_ms
        {
            self.flags.remove(PlayerFlags::ADJUSTING_VOLUME);
            return true;
        }
        false
    }

    /// Whether the player needs periodic redraws.
    pub fn needs_refresh(&self) -> bool {
        self.is_playing() || self.flags.contains(PlayerFlags::ADJUSTING_VOLUME)
    }

    pub fn label(&self) -> String {
        match &self.metadata {
            Some(m) => m.clone(),
            None => self.mime.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Refresh timer
// ---------------------------------------------------------------------------

/// Interval of the player refresh timer (~15 Hz).
pub const PLAYER_TICK: Duration = Duration::from_millis(1000 / 15);

/// Background timer that asks the UI thread to redraw players.
///
/// The thread never touches widget state; it only posts
/// [`Notification::PlayerUpdate`]. Dropping the timer stops it.
pub struct PlayerTimer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlayerTimer {
    pub fn start(session: SessionId, tx: Sender<Notification>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            loop {
                std::thread::sleep(PLAYER_TICK);
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(Notification::PlayerUpdate(session)).is_err() {
                    break;
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
    }

    /// Stop posting notifications. Pending ones may still arrive.
    pub fn cancel(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // The thread exits after its current sleep.
        self.handle.take();
    }
}

impl Drop for PlayerTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn set_and_remove() {
        let mut m = Media::new();
        let id = m.set_data(3, Some("audio/mpeg"), b"abc", MediaFlags::PARTIAL_DATA).unwrap();
        assert_eq!(m.find_audio(3), Some(id));
        assert!(m.audio(id).unwrap().partial);
        // Update in place keeps the id.
        let again = m.set_data(3, Some("audio/mpeg"), b"abcdef", MediaFlags::empty()).unwrap();
        assert_eq!(id, again);
        assert_eq!(m.audio(id).unwrap().data_len, 6);
        m.set_data(3, None, &[], MediaFlags::empty());
        assert!(m.is_empty());
    }

    #[test]
    fn permanence_follows_allow_hide() {
        let mut m = Media::new();
        m.set_data(1, Some("image/png"), b"x", MediaFlags::empty());
        m.set_data(2, Some("image/png"), b"x", MediaFlags::ALLOW_HIDE);
        assert!(m.is_permanent(1));
        assert!(!m.is_permanent(2));
    }

    #[test]
    fn undecodable_image_gets_placeholder_size() {
        let mut m = Media::new();
        let id = m.set_data(1, Some("image/png"), b"not a png", MediaFlags::empty()).unwrap();
        assert_eq!(m.image(id).unwrap().size, PLACEHOLDER_IMAGE_SIZE);
    }

    #[test]
    fn png_dimensions_are_read() {
        let mut png = Vec::new();
        image::RgbImage::new(7, 5)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(image_dimensions(&png), Some(Int2::new(7, 5)));
    }

    #[test]
    fn other_types_are_ignored() {
        let mut m = Media::new();
        assert!(m.set_data(1, Some("text/plain"), b"x", MediaFlags::empty()).is_none());
        assert!(m.is_empty());
    }

    #[test]
    fn player_time_and_pause() {
        let mut p = Player::new("audio/ogg");
        p.start(1000);
        assert!(p.is_playing());
        p.set_paused(true, 1800);
        assert!((p.time(5000) - 0.8).abs() < 1e-9);
        p.toggle(6000);
        assert!((p.time(6200) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rewind_after_half_second() {
        let mut p = Player::new("audio/ogg");
        p.start(0);
        p.rewind(400);
        assert!(p.is_playing());
        p.rewind(900);
        assert!(p.is_paused());
        assert_eq!(p.time(2000), 0.0);
    }

    #[test]
    fn volume_ui_expires() {
        let mut p = Player::new("audio/ogg");
        p.toggle_volume_ui(100);
        assert!(!p.expire_volume_ui(2000, 3000));
        assert!(p.expire_volume_ui(3100, 3000));
        assert!(!p.flags.contains(PlayerFlags::ADJUSTING_VOLUME));
        p.set_volume(3.0);
        assert_eq!(p.volume(), 1.0);
    }

    #[test]
    fn timer_posts_and_stops() {
        let (tx, rx) = mpsc::channel();
        let mut timer = PlayerTimer::start(SessionId(7), tx);
        let got = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, Notification::PlayerUpdate(SessionId(7)));
        timer.cancel();
        assert!(!timer.is_running());
    }
}
