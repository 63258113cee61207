//! Virtual-key code mapping for Windows.
//!
//! Character keys are read from the active layout with `ToUnicode`; keys that
//! do not produce text use a fixed table.

use crate::error::Result;
use crate::event::KeyCode;
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, Modifier, ModifierKeycodes};
use crate::platform::KeyboardLayout;
use log::debug;
use std::ops::RangeInclusive;
use windows::Win32::UI::Input::KeyboardAndMouse::{MAPVK_VK_TO_VSC, MapVirtualKeyW, ToUnicode};

pub const VK_SHIFT: u16 = 0x10;
pub const VK_CAPITAL: u16 = 0x14;
pub const VK_NUMLOCK: u16 = 0x90;
pub const VK_LSHIFT: u16 = 0xA0;
pub const VK_RSHIFT: u16 = 0xA1;
pub const VK_LCONTROL: u16 = 0xA2;
pub const VK_RCONTROL: u16 = 0xA3;
pub const VK_LMENU: u16 = 0xA4;
pub const VK_RMENU: u16 = 0xA5;
pub const VK_LWIN: u16 = 0x5B;
pub const VK_RWIN: u16 = 0x5C;

const MIN_KEYCODE: KeyCode = 0x01;
const MAX_KEYCODE: KeyCode = 0xFE;

/// Keys that never produce text.
static NAMED_KEYS: &[(u16, u32)] = &[
    (0x03, 0xff6b), // VK_CANCEL -> Break
    (0x08, 0xff08), // VK_BACK
    (0x09, 0xff09), // VK_TAB
    (0x0C, 0xff0b), // VK_CLEAR
    (0x0D, 0xff0d), // VK_RETURN
    (0x13, 0xff13), // VK_PAUSE
    (0x14, 0xffe5), // VK_CAPITAL
    (0x1B, 0xff1b), // VK_ESCAPE
    (0x21, 0xff55), // VK_PRIOR
    (0x22, 0xff56), // VK_NEXT
    (0x23, 0xff57), // VK_END
    (0x24, 0xff50), // VK_HOME
    (0x25, 0xff51), // VK_LEFT
    (0x26, 0xff52), // VK_UP
    (0x27, 0xff53), // VK_RIGHT
    (0x28, 0xff54), // VK_DOWN
    (0x29, 0xff60), // VK_SELECT
    (0x2B, 0xff62), // VK_EXECUTE
    (0x2C, 0xff61), // VK_SNAPSHOT -> Print
    (0x2D, 0xff63), // VK_INSERT
    (0x2E, 0xffff), // VK_DELETE
    (0x2F, 0xff6a), // VK_HELP
    (0x5B, 0xffeb), // VK_LWIN
    (0x5C, 0xffec), // VK_RWIN
    (0x5D, 0xff67), // VK_APPS -> Menu
    (0x60, 0xffb0), // VK_NUMPAD0
    (0x61, 0xffb1),
    (0x62, 0xffb2),
    (0x63, 0xffb3),
    (0x64, 0xffb4),
    (0x65, 0xffb5),
    (0x66, 0xffb6),
    (0x67, 0xffb7),
    (0x68, 0xffb8),
    (0x69, 0xffb9),
    (0x6A, 0xffaa), // VK_MULTIPLY
    (0x6B, 0xffab), // VK_ADD
    (0x6C, 0xffac), // VK_SEPARATOR
    (0x6D, 0xffad), // VK_SUBTRACT
    (0x6E, 0xffae), // VK_DECIMAL
    (0x6F, 0xffaf), // VK_DIVIDE
    (0x90, 0xff7f), // VK_NUMLOCK
    (0x91, 0xff14), // VK_SCROLL
    (0xA0, 0xffe1), // VK_LSHIFT
    (0xA1, 0xffe2), // VK_RSHIFT
    (0xA2, 0xffe3), // VK_LCONTROL
    (0xA3, 0xffe4), // VK_RCONTROL
    (0xA4, 0xffe9), // VK_LMENU
    (0xA5, 0xffea), // VK_RMENU
];

/// F1..=F24 occupy consecutive codes from 0x70.
const VK_F1: u16 = 0x70;
const FUNCTION_KEYS: u16 = 24;

/// Keys that need `KEYEVENTF_EXTENDEDKEY` when injected.
pub fn is_extended_key(vk: u16) -> bool {
    matches!(
        vk,
        0x21..=0x28 | 0x2C | 0x2D | 0x2E | 0x5B | 0x5C | 0x5D | 0x6F | 0x90 | 0xA3 | 0xA5
    )
}

fn named_keysym(vk: u16) -> Option<Keysym> {
    if (VK_F1..VK_F1 + FUNCTION_KEYS).contains(&vk) {
        return Some(Keysym(Keysym::F1.0 + (vk - VK_F1) as u32));
    }
    NAMED_KEYS
        .iter()
        .find(|(code, _)| *code == vk)
        .map(|(_, sym)| Keysym(*sym))
}

const VK_CONTROL: u16 = 0x11;
const VK_MENU: u16 = 0x12;

/// Row columns: plain, Shift, AltGr, AltGr+Shift.
type Row = [Keysym; 4];

/// The character a key produces under the given modifiers, if exactly one.
///
/// AltGr is reported to `ToUnicode` as Control+Alt held together.
fn layout_char(vk: u16, shifted: bool, altgr: bool) -> Option<char> {
    let mut state = [0u8; 256];
    if shifted {
        state[VK_SHIFT as usize] = 0x80;
    }
    if altgr {
        for key in [VK_CONTROL, VK_MENU, VK_LCONTROL, VK_RMENU] {
            state[key as usize] = 0x80;
        }
    }
    let mut buffer = [0u16; 4];
    let count = unsafe {
        let scan = MapVirtualKeyW(vk as u32, MAPVK_VK_TO_VSC);
        // Flag 0x4 leaves the kernel's dead-key state untouched.
        ToUnicode(vk as u32, scan, Some(&state), &mut buffer, 0x4)
    };
    if count != 1 {
        return None;
    }
    char::from_u32(buffer[0] as u32).filter(|c| !c.is_control())
}

/// Snapshot of the active keyboard layout in keysym terms.
#[derive(Debug, Clone)]
pub struct WindowsLayout {
    rows: Vec<Row>,
    modifiers: ModifierKeycodes,
}

impl WindowsLayout {
    /// Read the layout of the calling thread.
    pub fn load() -> Self {
        let rows = (MIN_KEYCODE..=MAX_KEYCODE)
            .map(|code| {
                let vk = code as u16;
                if let Some(sym) = named_keysym(vk) {
                    return [sym, Keysym::NO_SYMBOL, Keysym::NO_SYMBOL, Keysym::NO_SYMBOL];
                }
                let column = |shifted, altgr| {
                    layout_char(vk, shifted, altgr)
                        .and_then(Keysym::from_char)
                        .unwrap_or(Keysym::NO_SYMBOL)
                };
                [
                    column(false, false),
                    column(true, false),
                    column(false, true),
                    column(true, true),
                ]
            })
            .collect::<Vec<_>>();

        let layout = Self::from_rows(rows);
        let keys = layout
            .rows
            .iter()
            .filter(|row| row[0] != Keysym::NO_SYMBOL)
            .count();
        let altgr = layout.has_altgr();
        debug!("Windows layout loaded: {keys} keys with symbols, AltGr {altgr}");
        layout
    }

    /// Build from rows indexed by `code - MIN_KEYCODE`.
    ///
    /// When any key has an AltGr symbol, right Alt is bound as Mode_switch on
    /// Mod5 so the AltGr columns become the second group.
    fn from_rows(mut rows: Vec<Row>) -> Self {
        let altgr = rows
            .iter()
            .any(|row| row[2..].iter().any(|sym| *sym != Keysym::NO_SYMBOL));

        let mut modifiers = ModifierKeycodes::new()
            .with(Modifier::Shift, [VK_LSHIFT as KeyCode, VK_RSHIFT as KeyCode])
            .with(Modifier::Lock, [VK_CAPITAL as KeyCode])
            .with(Modifier::Control, [VK_LCONTROL as KeyCode, VK_RCONTROL as KeyCode])
            .with(Modifier::Mod2, [VK_NUMLOCK as KeyCode])
            .with(Modifier::SUPER, [VK_LWIN as KeyCode, VK_RWIN as KeyCode]);

        if altgr {
            if let Some(row) = rows.get_mut((VK_RMENU as KeyCode - MIN_KEYCODE) as usize) {
                *row = [
                    Keysym::MODE_SWITCH,
                    Keysym::NO_SYMBOL,
                    Keysym::NO_SYMBOL,
                    Keysym::NO_SYMBOL,
                ];
            }
            modifiers.add(Modifier::Alt, [VK_LMENU as KeyCode]);
            modifiers.add(Modifier::Mod5, [VK_RMENU as KeyCode]);
        } else {
            modifiers.add(Modifier::Alt, [VK_LMENU as KeyCode, VK_RMENU as KeyCode]);
        }

        Self { rows, modifiers }
    }

    fn has_altgr(&self) -> bool {
        self.modifiers
            .group(Modifier::Mod5)
            .contains(&(VK_RMENU as KeyCode))
    }

    fn row(&self, code: KeyCode) -> Option<&Row> {
        if (MIN_KEYCODE..=MAX_KEYCODE).contains(&code) {
            self.rows.get((code - MIN_KEYCODE) as usize)
        } else {
            None
        }
    }
}

impl KeyboardLayout for WindowsLayout {
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
        if keysym == Keysym::NO_SYMBOL {
            return None;
        }
        (0..4).find_map(|column| {
            (MIN_KEYCODE..=MAX_KEYCODE)
                .find(|code| self.row(*code).map(|row| row[column]) == Some(keysym))
        })
    }

    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
        let mut syms = self.row(code).map(|row| row.to_vec()).unwrap_or_default();
        while syms.last() == Some(&Keysym::NO_SYMBOL) {
            syms.pop();
        }
        syms
    }

    fn keycode_range(&self) -> RangeInclusive<KeyCode> {
        MIN_KEYCODE..=MAX_KEYCODE
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
        Ok(self.modifiers.clone())
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::ToggleOnPress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeySymbol;
    use crate::keymap::KeyTable;
    use crate::modifier::ModifierSet;

    #[test]
    fn test_named_keys() {
        assert_eq!(named_keysym(0x0D), Some(Keysym::RETURN));
        assert_eq!(named_keysym(0x1B), Some(Keysym::ESCAPE));
        assert_eq!(named_keysym(0x70), Some(Keysym::F1));
        assert_eq!(named_keysym(0x87), Some(Keysym(0xffd5)));
        assert_eq!(named_keysym(0x41), None);
    }

    fn blank_rows() -> Vec<Row> {
        (MIN_KEYCODE..=MAX_KEYCODE)
            .map(|code| {
                let sym = named_keysym(code as u16).unwrap_or(Keysym::NO_SYMBOL);
                [sym, Keysym::NO_SYMBOL, Keysym::NO_SYMBOL, Keysym::NO_SYMBOL]
            })
            .collect()
    }

    fn set_row(rows: &mut [Row], vk: u16, chars: [Option<char>; 4]) {
        rows[(vk as KeyCode - MIN_KEYCODE) as usize] =
            chars.map(|c| c.and_then(Keysym::from_char).unwrap_or(Keysym::NO_SYMBOL));
    }

    #[test]
    fn test_altgr_column_is_second_group() {
        // German layout: AltGr+Q types '@'.
        let mut rows = blank_rows();
        set_row(&mut rows, 0x51, [Some('q'), Some('Q'), Some('@'), None]);
        let layout = WindowsLayout::from_rows(rows);
        assert!(layout.has_altgr());
        assert_eq!(
            layout.keycode_to_keysyms(VK_RMENU as KeyCode),
            vec![Keysym::MODE_SWITCH]
        );

        let table = KeyTable::build(&layout).unwrap();
        let (code, required) = table
            .resolve_with_modifiers(&KeySymbol::Char('@'))
            .unwrap();
        assert_eq!(code, 0x51);
        assert_eq!(required, ModifierSet::MOD5);
        assert_eq!(table.mode_switch_keycode(), Some(VK_RMENU as KeyCode));
        assert_eq!(
            table.lookup_keysym(0x51, ModifierSet::MOD5),
            Keysym::from_char('@').unwrap()
        );
    }

    #[test]
    fn test_without_altgr_right_alt_is_alt() {
        let mut rows = blank_rows();
        set_row(&mut rows, 0x51, [Some('q'), Some('Q'), None, None]);
        let layout = WindowsLayout::from_rows(rows);
        assert!(!layout.has_altgr());
        assert!(
            layout
                .modifier_keycodes()
                .unwrap()
                .group(Modifier::Alt)
                .contains(&(VK_RMENU as KeyCode))
        );
        let table = KeyTable::build(&layout).unwrap();
        assert!(table.mode_switch_mask().is_empty());
        assert_eq!(table.mode_switch_keycode(), None);
    }

    #[test]
    fn test_extended_keys() {
        assert!(is_extended_key(0x25));
        assert!(is_extended_key(VK_RMENU));
        assert!(!is_extended_key(VK_LMENU));
        assert!(!is_extended_key(0x41));
    }
}
