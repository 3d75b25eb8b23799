//! Keyboard shortcuts for opening visible links.
//!
//! In link-key mode each visible link gets an ordinal, shown as a circled
//! glyph next to it. Pressing the matching key opens the link.

use serde::{Deserialize, Serialize};

/// How ordinals map to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrdinalMode {
    /// `1`-`9`, then `a`-`z`.
    #[default]
    NumbersAndAlphabet,
    /// Letters sorted by distance from the home row.
    HomeRow,
}

/// Sorted by proximity to F and J.
pub const HOME_ROW_KEYS: [char; 26] = [
    'f', 'd', 's', 'a', 'j', 'k', 'l', 'r', 'e', 'w', 'q', 'u', 'i', 'o', 'p', 'v', 'c', 'x', 'z',
    'm', 'n', 'g', 'h', 'b', 't', 'y',
];

/// Letters left out when platform shortcuts must keep working
/// (hide, minimize, quit, close).
const RESERVED_LETTERS: [char; 4] = ['h', 'm', 'q', 'w'];

const DINGBAT_ONE: u32 = 0x278a;
const CIRCLED_A: u32 = 0x24b6;

fn letters(reserve: bool) -> impl Iterator<Item = char> {
    ('a'..='z').filter(move |c| !reserve || !RESERVED_LETTERS.contains(c))
}

/// Ordinal selected by `key`, if any.
pub fn ordinal_from_key(mode: OrdinalMode, key: char, reserve: bool) -> Option<usize> {
    match mode {
        OrdinalMode::NumbersAndAlphabet => {
            if let Some(d) = key.to_digit(10).filter(|&d| d >= 1) {
                return Some(d as usize - 1);
            }
            letters(reserve).position(|c| c == key).map(|i| i + 9)
        },
        OrdinalMode::HomeRow => HOME_ROW_KEYS.iter().position(|&c| c == key),
    }
}

/// Key that selects `ord`.
pub fn ordinal_key(mode: OrdinalMode, ord: usize, reserve: bool) -> Option<char> {
    match mode {
        OrdinalMode::NumbersAndAlphabet => {
            if ord < 9 {
                return char::from_digit(ord as u32 + 1, 10);
            }
            letters(reserve).nth(ord - 9)
        },
        OrdinalMode::HomeRow => HOME_ROW_KEYS.get(ord).copied(),
    }
}

/// Glyph drawn next to the link with ordinal `ord`.
pub fn ordinal_glyph(mode: OrdinalMode, ord: usize, reserve: bool) -> Option<char> {
    let key = ordinal_key(mode, ord, reserve)?;
    if mode == OrdinalMode::NumbersAndAlphabet && ord < 9 {
        return char::from_u32(DINGBAT_ONE + ord as u32);
    }
    char::from_u32(CIRCLED_A + (key as u32 - 'a' as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_then_letters() {
        let m = OrdinalMode::NumbersAndAlphabet;
        assert_eq!(ordinal_from_key(m, '1', false), Some(0));
        assert_eq!(ordinal_from_key(m, '9', false), Some(8));
        assert_eq!(ordinal_from_key(m, '0', false), None);
        assert_eq!(ordinal_from_key(m, 'a', false), Some(9));
        assert_eq!(ordinal_from_key(m, 'z', false), Some(34));
        assert_eq!(ordinal_glyph(m, 0, false), Some('\u{278a}'));
        assert_eq!(ordinal_glyph(m, 9, false), Some('\u{24b6}'));
        assert_eq!(ordinal_glyph(m, 35, false), None);
    }

    #[test]
    fn reserved_letters_skipped() {
        let m = OrdinalMode::NumbersAndAlphabet;
        assert_eq!(ordinal_from_key(m, 'h', true), None);
        assert_eq!(ordinal_from_key(m, 'i', true), Some(9 + 7));
        assert_eq!(ordinal_key(m, 9 + 7, true), Some('i'));
        assert_eq!(ordinal_key(m, 9 + 22, true), None);
    }

    #[test]
    fn home_row() {
        let m = OrdinalMode::HomeRow;
        assert_eq!(ordinal_from_key(m, 'f', false), Some(0));
        assert_eq!(ordinal_from_key(m, 'j', false), Some(4));
        assert_eq!(ordinal_from_key(m, '1', false), None);
        assert_eq!(ordinal_glyph(m, 0, false), Some('\u{24bb}'));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn key_and_ordinal_agree(
                ord in 0usize..40,
                reserve in any::<bool>(),
                home in any::<bool>(),
            ) {
                let mode = if home { OrdinalMode::HomeRow } else { OrdinalMode::NumbersAndAlphabet };
                if let Some(key) = ordinal_key(mode, ord, reserve) {
                    prop_assert_eq!(ordinal_from_key(mode, key, reserve), Some(ord));
                    prop_assert!(ordinal_glyph(mode, ord, reserve).is_some());
                }
            }
        }
    }
}
