//! The default keyboard layout: US QWERTY on X11 (evdev-derived) keycodes.
//!
//! Backs the loopback backend and serves as the reference layout for
//! resolution and decoding tests.

use crate::error::Result;
use crate::event::KeyCode;
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, Modifier, ModifierKeycodes};
use crate::platform::KeyboardLayout;
use std::ops::RangeInclusive;

const MIN_KEYCODE: KeyCode = 8;
const MAX_KEYCODE: KeyCode = 255;

const ESCAPE: u32 = 0xff1b;
const BACKSPACE: u32 = 0xff08;
const TAB: u32 = 0xff09;
const ISO_LEFT_TAB: u32 = 0xfe20;
const RETURN: u32 = 0xff0d;
const CONTROL_L: u32 = 0xffe3;
const CONTROL_R: u32 = 0xffe4;
const SHIFT_L: u32 = 0xffe1;
const SHIFT_R: u32 = 0xffe2;
const ALT_L: u32 = 0xffe9;
const ALT_R: u32 = 0xffea;
const META_L: u32 = 0xffe7;
const META_R: u32 = 0xffe8;
const SUPER_L: u32 = 0xffeb;
const SUPER_R: u32 = 0xffec;
const CAPS_LOCK: u32 = 0xffe5;
const NUM_LOCK: u32 = 0xff7f;
const SCROLL_LOCK: u32 = 0xff14;
const MODE_SWITCH: u32 = 0xff7e;

/// Keycode rows: `[unshifted, shifted]`, X11 keysym values.
const ROWS: &[(KeyCode, &[u32])] = &[
    (9, &[ESCAPE]),
    // Number row
    (10, &['1' as u32, '!' as u32]),
    (11, &['2' as u32, '@' as u32]),
    (12, &['3' as u32, '#' as u32]),
    (13, &['4' as u32, '$' as u32]),
    (14, &['5' as u32, '%' as u32]),
    (15, &['6' as u32, '^' as u32]),
    (16, &['7' as u32, '&' as u32]),
    (17, &['8' as u32, '*' as u32]),
    (18, &['9' as u32, '(' as u32]),
    (19, &['0' as u32, ')' as u32]),
    (20, &['-' as u32, '_' as u32]),
    (21, &['=' as u32, '+' as u32]),
    (22, &[BACKSPACE]),
    (23, &[TAB, ISO_LEFT_TAB]),
    // Top letter row
    (24, &['q' as u32, 'Q' as u32]),
    (25, &['w' as u32, 'W' as u32]),
    (26, &['e' as u32, 'E' as u32]),
    (27, &['r' as u32, 'R' as u32]),
    (28, &['t' as u32, 'T' as u32]),
    (29, &['y' as u32, 'Y' as u32]),
    (30, &['u' as u32, 'U' as u32]),
    (31, &['i' as u32, 'I' as u32]),
    (32, &['o' as u32, 'O' as u32]),
    (33, &['p' as u32, 'P' as u32]),
    (34, &['[' as u32, '{' as u32]),
    (35, &[']' as u32, '}' as u32]),
    (36, &[RETURN]),
    (37, &[CONTROL_L]),
    // Home row
    (38, &['a' as u32, 'A' as u32]),
    (39, &['s' as u32, 'S' as u32]),
    (40, &['d' as u32, 'D' as u32]),
    (41, &['f' as u32, 'F' as u32]),
    (42, &['g' as u32, 'G' as u32]),
    (43, &['h' as u32, 'H' as u32]),
    (44, &['j' as u32, 'J' as u32]),
    (45, &['k' as u32, 'K' as u32]),
    (46, &['l' as u32, 'L' as u32]),
    (47, &[';' as u32, ':' as u32]),
    (48, &['\'' as u32, '"' as u32]),
    (49, &['`' as u32, '~' as u32]),
    (50, &[SHIFT_L]),
    (51, &['\\' as u32, '|' as u32]),
    // Bottom row
    (52, &['z' as u32, 'Z' as u32]),
    (53, &['x' as u32, 'X' as u32]),
    (54, &['c' as u32, 'C' as u32]),
    (55, &['v' as u32, 'V' as u32]),
    (56, &['b' as u32, 'B' as u32]),
    (57, &['n' as u32, 'N' as u32]),
    (58, &['m' as u32, 'M' as u32]),
    (59, &[',' as u32, '<' as u32]),
    (60, &['.' as u32, '>' as u32]),
    (61, &['/' as u32, '?' as u32]),
    (62, &[SHIFT_R]),
    (63, &[0xffaa]),
    (64, &[ALT_L, META_L]),
    (65, &[' ' as u32]),
    (66, &[CAPS_LOCK]),
    // F1..F10
    (67, &[0xffbe]),
    (68, &[0xffbf]),
    (69, &[0xffc0]),
    (70, &[0xffc1]),
    (71, &[0xffc2]),
    (72, &[0xffc3]),
    (73, &[0xffc4]),
    (74, &[0xffc5]),
    (75, &[0xffc6]),
    (76, &[0xffc7]),
    (77, &[NUM_LOCK]),
    (78, &[SCROLL_LOCK]),
    // Keypad: [function, numeral]
    (79, &[0xff95, 0xffb7]),
    (80, &[0xff97, 0xffb8]),
    (81, &[0xff9a, 0xffb9]),
    (82, &[0xffad]),
    (83, &[0xff96, 0xffb4]),
    (84, &[0xff9d, 0xffb5]),
    (85, &[0xff98, 0xffb6]),
    (86, &[0xffab]),
    (87, &[0xff9c, 0xffb1]),
    (88, &[0xff99, 0xffb2]),
    (89, &[0xff9b, 0xffb3]),
    (90, &[0xff9e, 0xffb0]),
    (91, &[0xff9f, 0xffae]),
    (95, &[0xffc8]),
    (96, &[0xffc9]),
    (104, &[0xff8d]),
    (105, &[CONTROL_R]),
    (106, &[0xffaf]),
    (107, &[0xff61]),
    (108, &[ALT_R, META_R]),
    // Navigation cluster
    (110, &[0xff50]),
    (111, &[0xff52]),
    (112, &[0xff55]),
    (113, &[0xff51]),
    (114, &[0xff53]),
    (115, &[0xff57]),
    (116, &[0xff54]),
    (117, &[0xff56]),
    (118, &[0xff63]),
    (119, &[0xffff]),
    (127, &[0xff13]),
    (133, &[SUPER_L]),
    (134, &[SUPER_R]),
    (135, &[0xff67]),
    (203, &[MODE_SWITCH]),
];

/// US QWERTY layout with the standard X11 modifier map.
#[derive(Debug, Clone, Copy)]
pub struct UsLayout {
    lock_style: LockStyle,
}

impl Default for UsLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl UsLayout {
    /// X server lock semantics ([`LockStyle::UnlockOnRelease`]).
    pub fn new() -> Self {
        Self {
            lock_style: LockStyle::UnlockOnRelease,
        }
    }

    pub fn with_lock_style(lock_style: LockStyle) -> Self {
        Self { lock_style }
    }

    fn row(code: KeyCode) -> Option<&'static [u32]> {
        ROWS.iter()
            .find(|(row_code, _)| *row_code == code)
            .map(|(_, row)| *row)
    }
}

impl KeyboardLayout for UsLayout {
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
        if keysym == Keysym::NO_SYMBOL {
            return None;
        }
        // Lower column wins, then lower keycode.
        (0..2).find_map(|index| {
            ROWS.iter()
                .find(|(_, row)| row.get(index) == Some(&keysym.0))
                .map(|(code, _)| *code)
        })
    }

    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
        Self::row(code)
            .map(|row| row.iter().copied().map(Keysym).collect())
            .unwrap_or_default()
    }

    fn keycode_range(&self) -> RangeInclusive<KeyCode> {
        MIN_KEYCODE..=MAX_KEYCODE
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
        Ok(ModifierKeycodes::new()
            .with(Modifier::Shift, [50, 62])
            .with(Modifier::Lock, [66])
            .with(Modifier::Control, [37, 105])
            .with(Modifier::Alt, [64, 108])
            .with(Modifier::Mod2, [77])
            .with(Modifier::Mod4, [133, 134])
            .with(Modifier::Mod5, [203]))
    }

    fn lock_style(&self) -> LockStyle {
        self.lock_style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_sorted_and_unique() {
        for pair in ROWS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "keycode {} out of order", pair[1].0);
        }
    }

    #[test]
    fn test_keysym_to_keycode() {
        let layout = UsLayout::new();
        assert_eq!(layout.keysym_to_keycode(Keysym('a' as u32)), Some(38));
        assert_eq!(layout.keysym_to_keycode(Keysym('A' as u32)), Some(38));
        assert_eq!(layout.keysym_to_keycode(Keysym('!' as u32)), Some(10));
        assert_eq!(layout.keysym_to_keycode(Keysym::RETURN), Some(36));
        assert_eq!(layout.keysym_to_keycode(Keysym(0xffb5)), Some(84));
        assert_eq!(layout.keysym_to_keycode(Keysym(0xe9)), None);
        assert_eq!(layout.keysym_to_keycode(Keysym::NO_SYMBOL), None);
    }

    #[test]
    fn test_unassigned_keycode_has_no_symbols() {
        let layout = UsLayout::new();
        assert!(layout.keycode_to_keysyms(94).is_empty());
        assert_eq!(
            layout.keycode_to_keysyms(59),
            vec![Keysym(',' as u32), Keysym('<' as u32)]
        );
    }

    #[test]
    fn test_modifier_map() {
        let mods = UsLayout::new().modifier_keycodes().unwrap();
        assert_eq!(mods.modifier_of(50), Some(Modifier::Shift));
        assert_eq!(mods.modifier_of(66), Some(Modifier::Lock));
        assert_eq!(mods.modifier_of(77), Some(Modifier::Mod2));
        assert_eq!(mods.modifier_of(203), Some(Modifier::Mod5));
    }
}
