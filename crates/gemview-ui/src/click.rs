//! Click gesture recognition: press, drag, release, double click, abort.

use gemview_types::geometry::{Int2, Rect};
use gemview_types::input::{InputEvent, MouseButton};

/// Outcome of feeding one event to a [`Click`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickResult {
    /// The event is not part of this gesture.
    None,
    /// Button pressed inside the bounds.
    Started,
    /// Pointer moved while the button is held.
    Drag,
    /// Button released.
    Finished,
    /// Second press of a double click.
    Double,
    /// The gesture was cancelled.
    Aborted,
}

/// Tracks one button's press/drag/release cycle.
#[derive(Debug, Clone)]
pub struct Click {
    button: MouseButton,
    active: bool,
    moved: bool,
    start_pos: Int2,
    pos: Int2,
}

/// Pixels the pointer may wander before a press counts as a drag.
const DRAG_THRESHOLD: i32 = 2;

impl Click {
    pub fn new(button: MouseButton) -> Self {
        Self {
            button,
            active: false,
            moved: false,
            start_pos: Int2::ZERO,
            pos: Int2::ZERO,
        }
    }

    pub fn process(&mut self, ev: &InputEvent, bounds: Rect) -> ClickResult {
        match *ev {
            InputEvent::MouseDown {
                button,
                pos,
                clicks,
                ..
            } if button == self.button => {
                if !bounds.contains(pos) {
                    return ClickResult::None;
                }
                self.active = true;
                self.moved = false;
                self.start_pos = pos;
                self.pos = pos;
                if clicks >= 2 {
                    ClickResult::Double
                } else {
                    ClickResult::Started
                }
            },
            InputEvent::MouseMove { pos, .. } if self.active => {
                self.pos = pos;
                let d = pos.sub(self.start_pos);
                if d.x.abs() > DRAG_THRESHOLD || d.y.abs() > DRAG_THRESHOLD {
                    self.moved = true;
                }
                if self.moved {
                    ClickResult::Drag
                } else {
                    ClickResult::None
                }
            },
            InputEvent::MouseUp { button, pos, .. } if button == self.button && self.active => {
                self.pos = pos;
                self.active = false;
                ClickResult::Finished
            },
            _ => ClickResult::None,
        }
    }

    /// Cancel an active gesture.
    pub fn cancel(&mut self) -> ClickResult {
        if self.active {
            self.active = false;
            ClickResult::Aborted
        } else {
            ClickResult::None
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the pointer left the drag threshold since the press.
    pub fn is_moved(&self) -> bool {
        self.moved
    }

    pub fn start_pos(&self) -> Int2 {
        self.start_pos
    }

    pub fn pos(&self) -> Int2 {
        self.pos
    }

    /// Whether the press began inside `rect`.
    pub fn started_inside(&self, rect: Rect) -> bool {
        rect.contains(self.start_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemview_types::input::Modifiers;

    fn down(x: i32, y: i32, clicks: u8) -> InputEvent {
        InputEvent::MouseDown {
            button: MouseButton::Left,
            pos: Int2::new(x, y),
            mods: Modifiers::NONE,
            clicks,
        }
    }

    fn up(x: i32, y: i32) -> InputEvent {
        InputEvent::MouseUp {
            button: MouseButton::Left,
            pos: Int2::new(x, y),
            mods: Modifiers::NONE,
        }
    }

    fn mv(x: i32, y: i32) -> InputEvent {
        InputEvent::MouseMove {
            pos: Int2::new(x, y),
            mods: Modifiers::NONE,
        }
    }

    const BOUNDS: Rect = Rect::new(0, 0, 100, 100);

    #[test]
    fn press_release_without_moving() {
        let mut c = Click::new(MouseButton::Left);
        assert_eq!(c.process(&down(10, 10, 1), BOUNDS), ClickResult::Started);
        assert_eq!(c.process(&mv(11, 10), BOUNDS), ClickResult::None);
        assert_eq!(c.process(&up(11, 10), BOUNDS), ClickResult::Finished);
        assert!(!c.is_moved());
    }

    #[test]
    fn drag_reported_past_threshold() {
        let mut c = Click::new(MouseButton::Left);
        c.process(&down(10, 10, 1), BOUNDS);
        assert_eq!(c.process(&mv(30, 10), BOUNDS), ClickResult::Drag);
        assert!(c.is_moved());
        assert_eq!(c.pos(), Int2::new(30, 10));
        assert_eq!(c.start_pos(), Int2::new(10, 10));
    }

    #[test]
    fn press_outside_bounds_ignored() {
        let mut c = Click::new(MouseButton::Left);
        assert_eq!(c.process(&down(200, 10, 1), BOUNDS), ClickResult::None);
        assert!(!c.is_active());
    }

    #[test]
    fn double_click() {
        let mut c = Click::new(MouseButton::Left);
        assert_eq!(c.process(&down(10, 10, 2), BOUNDS), ClickResult::Double);
    }

    #[test]
    fn other_button_ignored() {
        let mut c = Click::new(MouseButton::Left);
        let ev = InputEvent::MouseDown {
            button: MouseButton::Right,
            pos: Int2::new(1, 1),
            mods: Modifiers::NONE,
            clicks: 1,
        };
        assert_eq!(c.process(&ev, BOUNDS), ClickResult::None);
    }

    #[test]
    fn cancel_aborts_only_when_active() {
        let mut c = Click::new(MouseButton::Left);
        assert_eq!(c.cancel(), ClickResult::None);
        c.process(&down(1, 1, 1), BOUNDS);
        assert_eq!(c.cancel(), ClickResult::Aborted);
        assert!(!c.is_active());
    }
}
