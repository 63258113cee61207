//! macOS virtual keycode mapping (ANSI layout).

use crate::error::Result;
use crate::event::KeyCode;
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, Modifier, ModifierKeycodes};
use crate::platform::KeyboardLayout;
use objc2_core_graphics::CGEventFlags;
use std::ops::RangeInclusive;

const MIN_KEYCODE: KeyCode = 0;
const MAX_KEYCODE: KeyCode = 127;

pub const KVK_COMMAND: u16 = 55;
pub const KVK_SHIFT: u16 = 56;
pub const KVK_CAPS_LOCK: u16 = 57;
pub const KVK_OPTION: u16 = 58;
pub const KVK_CONTROL: u16 = 59;
pub const KVK_RIGHT_SHIFT: u16 = 60;
pub const KVK_RIGHT_OPTION: u16 = 61;
pub const KVK_RIGHT_CONTROL: u16 = 62;
pub const KVK_RIGHT_COMMAND: u16 = 54;

const fn c(ch: char) -> u32 {
    ch as u32
}

/// `(keycode, plain, shifted)`; a shifted value of 0 means no symbol.
static KEYS: &[(u16, u32, u32)] = &[
    (0, c('a'), c('A')),
    (1, c('s'), c('S')),
    (2, c('d'), c('D')),
    (3, c('f'), c('F')),
    (4, c('h'), c('H')),
    (5, c('g'), c('G')),
    (6, c('z'), c('Z')),
    (7, c('x'), c('X')),
    (8, c('c'), c('C')),
    (9, c('v'), c('V')),
    (11, c('b'), c('B')),
    (12, c('q'), c('Q')),
    (13, c('w'), c('W')),
    (14, c('e'), c('E')),
    (15, c('r'), c('R')),
    (16, c('y'), c('Y')),
    (17, c('t'), c('T')),
    (18, c('1'), c('!')),
    (19, c('2'), c('@')),
    (20, c('3'), c('#')),
    (21, c('4'), c('$')),
    (22, c('6'), c('^')),
    (23, c('5'), c('%')),
    (24, c('='), c('+')),
    (25, c('9'), c('(')),
    (26, c('7'), c('&')),
    (27, c('-'), c('_')),
    (28, c('8'), c('*')),
    (29, c('0'), c(')')),
    (30, c(']'), c('}')),
    (31, c('o'), c('O')),
    (32, c('u'), c('U')),
    (33, c('['), c('{')),
    (34, c('i'), c('I')),
    (35, c('p'), c('P')),
    (36, 0xff0d, 0), // Return
    (37, c('l'), c('L')),
    (38, c('j'), c('J')),
    (39, c('\''), c('"')),
    (40, c('k'), c('K')),
    (41, c(';'), c(':')),
    (42, c('\\'), c('|')),
    (43, c(','), c('<')),
    (44, c('/'), c('?')),
    (45, c('n'), c('N')),
    (46, c('m'), c('M')),
    (47, c('.'), c('>')),
    (48, 0xff09, 0), // Tab
    (49, c(' '), 0),
    (50, c('`'), c('~')),
    (51, 0xff08, 0), // Delete -> BackSpace
    (53, 0xff1b, 0), // Escape
    (54, 0xffec, 0), // Right Command -> Super_R
    (55, 0xffeb, 0), // Command -> Super_L
    (56, 0xffe1, 0), // Shift_L
    (57, 0xffe5, 0), // Caps_Lock
    (58, 0xffe9, 0), // Option -> Alt_L
    (59, 0xffe3, 0), // Control_L
    (60, 0xffe2, 0), // Shift_R
    (61, 0xffea, 0), // Alt_R
    (62, 0xffe4, 0), // Control_R
    (64, 0xffce, 0), // F17
    (65, 0xffae, 0), // KP_Decimal
    (67, 0xffaa, 0), // KP_Multiply
    (69, 0xffab, 0), // KP_Add
    (71, 0xff0b, 0), // Keypad Clear
    (75, 0xffaf, 0), // KP_Divide
    (76, 0xff8d, 0), // KP_Enter
    (78, 0xffad, 0), // KP_Subtract
    (79, 0xffcf, 0), // F18
    (80, 0xffd0, 0), // F19
    (81, 0xffbd, 0), // KP_Equal
    (82, 0xffb0, 0), // KP_0
    (83, 0xffb1, 0),
    (84, 0xffb2, 0),
    (85, 0xffb3, 0),
    (86, 0xffb4, 0),
    (87, 0xffb5, 0),
    (88, 0xffb6, 0),
    (89, 0xffb7, 0),
    (90, 0xffd1, 0), // F20
    (91, 0xffb8, 0),
    (92, 0xffb9, 0),
    (96, 0xffc2, 0),  // F5
    (97, 0xffc3, 0),  // F6
    (98, 0xffc4, 0),  // F7
    (99, 0xffc0, 0),  // F3
    (100, 0xffc5, 0), // F8
    (101, 0xffc6, 0), // F9
    (103, 0xffc8, 0), // F11
    (105, 0xffca, 0), // F13
    (106, 0xffcd, 0), // F16
    (107, 0xffcb, 0), // F14
    (109, 0xffc7, 0), // F10
    (111, 0xffc9, 0), // F12
    (113, 0xffcc, 0), // F15
    (114, 0xff6a, 0), // Help
    (115, 0xff50, 0), // Home
    (116, 0xff55, 0), // Page_Up
    (117, 0xffff, 0), // Forward Delete
    (118, 0xffc1, 0), // F4
    (119, 0xff57, 0), // End
    (120, 0xffbf, 0), // F2
    (121, 0xff56, 0), // Page_Down
    (122, 0xffbe, 0), // F1
    (123, 0xff51, 0), // Left
    (124, 0xff53, 0), // Right
    (125, 0xff54, 0), // Down
    (126, 0xff52, 0), // Up
];

/// The event flag a modifier key controls.
pub fn modifier_flag(code: u16) -> Option<CGEventFlags> {
    match code {
        KVK_SHIFT | KVK_RIGHT_SHIFT => Some(CGEventFlags::MaskShift),
        KVK_CONTROL | KVK_RIGHT_CONTROL => Some(CGEventFlags::MaskControl),
        KVK_OPTION | KVK_RIGHT_OPTION => Some(CGEventFlags::MaskAlternate),
        KVK_COMMAND | KVK_RIGHT_COMMAND => Some(CGEventFlags::MaskCommand),
        KVK_CAPS_LOCK => Some(CGEventFlags::MaskAlphaShift),
        _ => None,
    }
}

/// The fixed US ANSI layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacLayout;

impl MacLayout {
    fn row(code: KeyCode) -> Option<(u32, u32)> {
        KEYS.iter()
            .find(|(key, _, _)| *key as KeyCode == code)
            .map(|(_, plain, shifted)| (*plain, *shifted))
    }
}

impl KeyboardLayout for MacLayout {
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
        if keysym == Keysym::NO_SYMBOL {
            return None;
        }
        KEYS.iter()
            .find(|(_, plain, _)| *plain == keysym.0)
            .or_else(|| KEYS.iter().find(|(_, _, shifted)| *shifted == keysym.0))
            .map(|(code, _, _)| *code as KeyCode)
    }

    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
        match Self::row(code) {
            Some((plain, 0)) => vec![Keysym(plain)],
            Some((plain, shifted)) => vec![Keysym(plain), Keysym(shifted)],
            None => Vec::new(),
        }
    }

    fn keycode_range(&self) -> RangeInclusive<KeyCode> {
        MIN_KEYCODE..=MAX_KEYCODE
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
        Ok(ModifierKeycodes::new()
            .with(Modifier::Shift, [KVK_SHIFT as KeyCode, KVK_RIGHT_SHIFT as KeyCode])
            .with(Modifier::Lock, [KVK_CAPS_LOCK as KeyCode])
            .with(Modifier::Control, [KVK_CONTROL as KeyCode, KVK_RIGHT_CONTROL as KeyCode])
            .with(Modifier::Alt, [KVK_OPTION as KeyCode, KVK_RIGHT_OPTION as KeyCode])
            .with(Modifier::SUPER, [KVK_COMMAND as KeyCode, KVK_RIGHT_COMMAND as KeyCode]))
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::ToggleOnPress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_symbols() {
        let layout = MacLayout;
        assert_eq!(layout.keysym_to_keycode(Keysym(c('a'))), Some(0));
        assert_eq!(layout.keysym_to_keycode(Keysym(c('A'))), Some(0));
        assert_eq!(layout.keysym_to_keycode(Keysym(c('!'))), Some(18));
        assert_eq!(layout.keysym_to_keycode(Keysym::RETURN), Some(36));
        assert_eq!(
            layout.keycode_to_keysyms(49),
            vec![Keysym(c(' '))]
        );
        assert!(layout.keycode_to_keysyms(10).is_empty());
    }

    #[test]
    fn test_modifier_flags() {
        assert_eq!(modifier_flag(KVK_SHIFT), Some(CGEventFlags::MaskShift));
        assert_eq!(modifier_flag(KVK_CAPS_LOCK), Some(CGEventFlags::MaskAlphaShift));
        assert_eq!(modifier_flag(0), None);
    }
}
