//! Platform-agnostic input event types.
//!
//! Hosts map their native input to these enums. The document widget never
//! sees raw platform input.

use serde::{Deserialize, Serialize};

use crate::geometry::Int2;

/// A platform-agnostic input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer moved to an absolute position.
    MouseMove { pos: Int2, mods: Modifiers },
    /// Pointer button pressed.
    MouseDown {
        button: MouseButton,
        pos: Int2,
        mods: Modifiers,
        /// Click count reported by the platform (2 for a double click).
        clicks: u8,
    },
    /// Pointer button released.
    MouseUp {
        button: MouseButton,
        pos: Int2,
        mods: Modifiers,
    },
    /// Wheel or trackpad scroll. Positive `delta.y` scrolls up.
    Wheel {
        delta: Int2,
        pos: Int2,
        class: WheelClass,
        mods: Modifiers,
    },
    /// A key pressed.
    KeyDown { key: Key, mods: Modifiers, repeat: bool },
    /// A key released.
    KeyUp { key: Key, mods: Modifiers },
}

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// How a wheel event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelClass {
    /// Notched wheel: each unit is one step.
    Stepped,
    /// Trackpad or high-resolution wheel: deltas are pixels and already
    /// carry platform inertia.
    Precise,
}

/// Modifier key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl on most platforms, Cmd on macOS.
    pub primary: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        primary: false,
        alt: false,
    };

    pub const fn is_empty(&self) -> bool {
        !self.shift && !self.primary && !self.alt
    }
}

/// Keys the document widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A printable character key (lowercase for letters).
    Char(char),
    Escape,
    Enter,
    Space,
    PageUp,
    PageDown,
    Home,
    End,
    Up,
    Down,
    Left,
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_default_is_empty() {
        assert!(Modifiers::default().is_empty());
        assert_eq!(Modifiers::default(), Modifiers::NONE);
        let m = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        assert!(!m.is_empty());
    }

    #[test]
    fn wheel_event_equality() {
        let a = InputEvent::Wheel {
            delta: Int2::new(0, -1),
            pos: Int2::new(5, 5),
            class: WheelClass::Stepped,
            mods: Modifiers::NONE,
        };
        assert_eq!(a.clone(), a);
        let b = InputEvent::Wheel {
            delta: Int2::new(0, -1),
            pos: Int2::new(5, 5),
            class: WheelClass::Precise,
            mods: Modifiers::NONE,
        };
        assert_ne!(a, b);
    }

    #[test]
    fn key_serde_roundtrip() {
        for key in [Key::Char('a'), Key::Escape, Key::PageDown] {
            let json = serde_json::to_string(&key).unwrap();
            let back: Key = serde_json::from_str(&json).unwrap();
            assert_eq!(key, back);
        }
    }

    #[test]
    fn mouse_button_hash_distinct() {
        use std::collections::HashSet;
        let set: HashSet<_> = [MouseButton::Left, MouseButton::Middle, MouseButton::Right]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 3);
    }
}
