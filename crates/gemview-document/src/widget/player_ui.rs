//! Controls of an inline audio player.

use gemview_types::error::Result;
use gemview_types::geometry::{Int2, Rect};
use gemview_types::palette::{ColorId, FontId};

use crate::canvas::Canvas;
use crate::media::{Player, PlayerFlags};

/// Width of the extended volume area, in gap units.
const VOLUME_ADJUST_GAPS: i32 = 35;

/// Button and slider rectangles of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PlayerUi {
    pub bounds: Rect,
    pub play_pause: Rect,
    pub rewind: Rect,
    pub scrubber: Rect,
    pub volume: Rect,
    /// The volume button plus the slider area to its left.
    pub volume_adjust: Rect,
    pub volume_slider: Rect,
    pub menu: Rect,
}

impl PlayerUi {
    pub fn new(bounds: Rect, gap: i32) -> Self {
        let h = bounds.height();
        let play_pause = Rect::new(bounds.left() + gap / 2, bounds.top(), 3 * h / 2, h);
        let rewind = Rect::new(play_pause.right(), bounds.top(), h, h);
        let menu = Rect::new(bounds.right() - h - gap / 2, bounds.top(), h, h);
        let volume = Rect::new(menu.left() - h, bounds.top(), h, h);
        let adjust_w = h + VOLUME_ADJUST_GAPS * gap;
        let volume_adjust = Rect::new(volume.right() - adjust_w, bounds.top(), adjust_w, h);
        let scrubber = Rect::new(
            rewind.right(),
            bounds.top(),
            (volume.left() - rewind.right()).max(0),
            h,
        );
        let volume_slider = Rect::new(
            volume_adjust.left() + 2 * gap,
            bounds.top() + gap,
            (volume.left() - volume_adjust.left() - 3 * gap).max(1),
            (h - 2 * gap).max(1),
        );
        Self {
            bounds,
            play_pause,
            rewind,
            scrubber,
            volume,
            volume_adjust,
            volume_slider,
            menu,
        }
    }

    /// Where a press starts dragging the volume: the adjust area minus the
    /// volume button itself.
    pub fn volume_grab_area(&self) -> Rect {
        let a = self.volume_adjust;
        Rect::new(a.left(), a.top(), a.width() - a.height(), a.height())
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, player: &Player, now: u64) -> Result<()> {
        canvas.fill_rect(self.bounds, ColorId::UiBackground)?;
        let text_y = self.bounds.top() + self.bounds.height() / 4;
        let glyph = if player.is_playing() { "\u{23f8}" } else { "\u{25b6}" };
        canvas.draw_text(glyph, Int2::new(self.play_pause.left(), text_y), FontId::Symbols, ColorId::UiText)?;
        canvas.draw_text("\u{23ee}", Int2::new(self.rewind.left(), text_y), FontId::Symbols, ColorId::UiText)?;
        canvas.draw_text("\u{2630}", Int2::new(self.menu.left(), text_y), FontId::Symbols, ColorId::UiText)?;
        let adjusting = player.flags.contains(PlayerFlags::ADJUSTING_VOLUME);
        let volume_glyph = if player.volume() <= 0.0 { "\u{1f507}" } else { "\u{1f50a}" };
        canvas.draw_text(volume_glyph, Int2::new(self.volume.left(), text_y), FontId::Symbols, ColorId::UiText)?;
        if adjusting {
            let s = self.volume_slider;
            let mid_y = s.mid().y;
            canvas.draw_hline(Int2::new(s.left(), mid_y), s.width(), ColorId::UiTextDim)?;
            let knob_x = s.left() + (player.volume() * s.width() as f32) as i32;
            canvas.fill_rect(Rect::new(knob_x - 2, s.top(), 4, s.height()), ColorId::UiAccent)?;
            return Ok(());
        }
        let secs = player.time(now) as u64;
        let label = format!("{}:{:02}", secs / 60, secs % 60);
        canvas.draw_text(&label, Int2::new(self.scrubber.left(), text_y), FontId::UiLabel, ColorId::UiText)?;
        let bar_x = self.scrubber.left() + self.scrubber.width() / 4;
        let bar_w = self.scrubber.width() * 3 / 4 - self.bounds.height() / 2;
        if bar_w > 0 {
            let color = if player.is_streaming() { ColorId::UiTextDim } else { ColorId::UiAccent };
            canvas.draw_hline(Int2::new(bar_x, self.scrubber.mid().y), bar_w, color)?;
        }
        Ok(())
    }
}
