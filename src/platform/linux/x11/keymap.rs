//! Snapshot of the X server's core keyboard and modifier mappings.

use super::Connection;
use crate::error::{Error, Result};
use crate::event::KeyCode;
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, Modifier, ModifierKeycodes};
use crate::platform::KeyboardLayout;
use log::debug;
use std::ops::RangeInclusive;
use std::os::raw::{c_int, c_void};
use x11::xlib;

/// Columns beyond the first two groups are not used for lookups.
const MAX_COLUMNS: usize = 4;

#[derive(Debug, Clone)]
pub(super) struct X11Keymap {
    min_keycode: KeyCode,
    max_keycode: KeyCode,
    per_keycode: usize,
    keysyms: Vec<Keysym>,
    modifiers: ModifierKeycodes,
}

impl X11Keymap {
    /// Read the keyboard mapping (`XGetKeyboardMapping`) and modifier map
    /// (`XGetModifierMapping`) of a connection.
    pub fn load(connection: &Connection) -> Result<Self> {
        let display = connection.raw();
        let mut min: c_int = 0;
        let mut max: c_int = 0;
        unsafe { xlib::XDisplayKeycodes(display, &mut min, &mut max) };
        if min <= 0 || max < min {
            return Err(Error::Platform("XDisplayKeycodes failed".into()));
        }

        let count = max - min + 1;
        let mut per: c_int = 0;
        let keysyms = unsafe {
            let mapping =
                xlib::XGetKeyboardMapping(display, min as xlib::KeyCode, count, &mut per);
            if mapping.is_null() || per <= 0 {
                return Err(Error::Platform("XGetKeyboardMapping failed".into()));
            }
            let len = (count * per) as usize;
            let keysyms = std::slice::from_raw_parts(mapping, len)
                .iter()
                .map(|sym| Keysym(*sym as u32))
                .collect::<Vec<_>>();
            xlib::XFree(mapping as *mut c_void);
            keysyms
        };

        let mut modifiers = ModifierKeycodes::new();
        unsafe {
            let map = xlib::XGetModifierMapping(display);
            if map.is_null() {
                return Err(Error::Platform("XGetModifierMapping failed".into()));
            }
            let per_modifier = (*map).max_keypermod.max(0) as usize;
            let codes = std::slice::from_raw_parts((*map).modifiermap, per_modifier * 8);
            for (modifier, group) in Modifier::ALL.iter().zip(codes.chunks(per_modifier.max(1))) {
                modifiers.add(*modifier, group.iter().map(|code| *code as KeyCode));
            }
            xlib::XFreeModifiermap(map);
        }

        debug!("X keymap: keycodes {min}..={max}, {per} keysyms each, modifiers {modifiers:?}");

        Ok(Self {
            min_keycode: min as KeyCode,
            max_keycode: max as KeyCode,
            per_keycode: per as usize,
            keysyms,
            modifiers,
        })
    }

    fn row(&self, code: KeyCode) -> &[Keysym] {
        if !(self.min_keycode..=self.max_keycode).contains(&code) {
            return &[];
        }
        let start = (code - self.min_keycode) as usize * self.per_keycode;
        let width = self.per_keycode.min(MAX_COLUMNS);
        &self.keysyms[start..start + width]
    }
}

impl KeyboardLayout for X11Keymap {
    /// Same search order as `XKeysymToKeycode`: column first, then keycode.
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
        if keysym == Keysym::NO_SYMBOL {
            return None;
        }
        (0..self.per_keycode).find_map(|column| {
            (self.min_keycode..=self.max_keycode)
                .find(|code| self.row(*code).get(column) == Some(&keysym))
        })
    }

    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
        self.row(code).to_vec()
    }

    fn keycode_range(&self) -> RangeInclusive<KeyCode> {
        self.min_keycode..=self.max_keycode
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
        Ok(self.modifiers.clone())
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::UnlockOnRelease
    }
}
