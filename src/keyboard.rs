//! Keyboard synthesizer.

use crate::error::{Error, Result};
use crate::event::{KeyCode, KeySymbol};
use crate::keymap::KeyTable;
use crate::modifier::{Modifier, ModifierSet};
use crate::platform::{NativeInput, PlatformInput};
use log::trace;
use std::time::Duration;

/// Generates key presses, releases and typed text on a platform backend.
///
/// The resolution tables are built once when the keyboard is created; the
/// layout is assumed not to change while it is in use.
///
/// # Example
///
/// ```no_run
/// use userinput::Keyboard;
/// use std::time::Duration;
///
/// let keyboard = Keyboard::new()?;
/// keyboard.type_string("Hello, World!", Duration::from_millis(10))?;
/// keyboard.tap_key("Return", 1, Duration::ZERO)?;
/// # Ok::<(), userinput::Error>(())
/// ```
pub struct Keyboard<P = NativeInput> {
    platform: P,
    table: KeyTable,
}

impl Keyboard<NativeInput> {
    /// Open the native backend.
    pub fn new() -> Result<Self> {
        Self::with_platform(NativeInput::open()?)
    }
}

impl<P: PlatformInput> Keyboard<P> {
    /// Use an explicit backend.
    pub fn with_platform(platform: P) -> Result<Self> {
        let table = KeyTable::build(&platform)?;
        Ok(Self { platform, table })
    }

    /// Press a key, holding whatever modifiers the layout needs to produce it.
    pub fn press_key(&self, symbol: impl Into<KeySymbol>) -> Result<()> {
        let (code, required) = self.table.resolve_with_modifiers(&symbol.into())?;
        for modifier in self.modifier_keys(required)? {
            self.send(modifier, true)?;
        }
        self.send(code, true)
    }

    /// Release a key and any modifiers [`press_key`](Self::press_key) added for it.
    pub fn release_key(&self, symbol: impl Into<KeySymbol>) -> Result<()> {
        let (code, required) = self.table.resolve_with_modifiers(&symbol.into())?;
        self.send(code, false)?;
        for modifier in self.modifier_keys(required)?.into_iter().rev() {
            self.send(modifier, false)?;
        }
        Ok(())
    }

    /// Press and release a key `repeat` times, pausing `interval` after each.
    pub fn tap_key(
        &self,
        symbol: impl Into<KeySymbol>,
        repeat: usize,
        interval: Duration,
    ) -> Result<()> {
        let symbol = symbol.into();
        for _ in 0..repeat {
            self.press_key(symbol.clone())?;
            self.release_key(symbol.clone())?;
            pause(interval);
        }
        Ok(())
    }

    /// Press several keys in order, then release them in reverse order.
    ///
    /// Useful for shortcuts such as `["Control_L", "c"]`.
    pub fn press_keys<I, S>(&self, symbols: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<KeySymbol>,
    {
        let symbols: Vec<KeySymbol> = symbols.into_iter().map(Into::into).collect();
        for symbol in &symbols {
            self.press_key(symbol.clone())?;
        }
        for symbol in symbols.iter().rev() {
            self.release_key(symbol.clone())?;
        }
        Ok(())
    }

    /// Type a string, pressing Shift only when the case changes.
    ///
    /// Shift is pressed on the first character that needs it and stays down
    /// through following shifted characters and spaces; it is released before
    /// the next unshifted character and at the end of the string. Shifted
    /// characters are tapped by their own keycode, so Shift + `,` types `<`.
    /// `interval` is slept before every tap.
    ///
    /// Every character is resolved before anything is sent, so an unknown
    /// character fails the call without typing a partial string.
    pub fn type_string(&self, text: &str, interval: Duration) -> Result<()> {
        let resolved = text
            .chars()
            .map(|c| {
                self.table
                    .resolve_with_modifiers(&KeySymbol::Char(c))
                    .map(|(code, required)| (c, code, required))
            })
            .collect::<Result<Vec<_>>>()?;

        let shift = self.shift_keycode()?;
        let mut shift_held = false;
        for (c, code, required) in resolved {
            if required.has(Modifier::Shift) {
                if !shift_held {
                    pause(interval);
                    self.send(shift, true)?;
                    shift_held = true;
                }
            } else if shift_held && c != ' ' {
                self.send(shift, false)?;
                shift_held = false;
            }

            let extra = self.modifier_keys(required.without(ModifierSet::SHIFT))?;
            pause(interval);
            for modifier in &extra {
                self.send(*modifier, true)?;
            }
            self.send(code, true)?;
            self.send(code, false)?;
            for modifier in extra.iter().rev() {
                self.send(*modifier, false)?;
            }
        }

        if shift_held {
            self.send(shift, false)?;
        }
        Ok(())
    }

    /// The resolution tables of the active layout.
    pub fn key_table(&self) -> &KeyTable {
        &self.table
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn into_platform(self) -> P {
        self.platform
    }

    fn shift_keycode(&self) -> Result<KeyCode> {
        self.table
            .shift_keycode()
            .ok_or_else(|| Error::UnknownSymbol("Shift_L".into()))
    }

    /// Keycodes to hold for a required modifier mask: Shift first, then the
    /// group switch key.
    fn modifier_keys(&self, required: ModifierSet) -> Result<Vec<KeyCode>> {
        let mut keys = Vec::new();
        if required.contains(ModifierSet::SHIFT) {
            keys.push(self.shift_keycode()?);
        }
        let group = required.without(ModifierSet::SHIFT);
        if !group.is_empty() {
            let key = self
                .table
                .mode_switch_keycode()
                .ok_or_else(|| Error::UnknownSymbol("Mode_switch".into()))?;
            keys.push(key);
        }
        Ok(keys)
    }

    fn send(&self, code: KeyCode, pressed: bool) -> Result<()> {
        trace!("key {code} {}", if pressed { "down" } else { "up" });
        self.platform.inject_key_event(code, pressed)
    }
}

fn pause(interval: Duration) {
    if !interval.is_zero() {
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::loopback::LoopbackInput;

    const SHIFT: KeyCode = 50;

    fn keyboard() -> Keyboard<LoopbackInput> {
        Keyboard::with_platform(LoopbackInput::new()).unwrap()
    }

    fn typed(text: &str) -> Vec<(KeyCode, bool)> {
        let kb = keyboard();
        kb.type_string(text, Duration::ZERO).unwrap();
        kb.platform().take_key_events()
    }

    #[test]
    fn test_press_and_release_plain_key() {
        let kb = keyboard();
        kb.press_key('a').unwrap();
        kb.release_key('a').unwrap();
        assert_eq!(kb.platform().take_key_events(), vec![(38, true), (38, false)]);
    }

    #[test]
    fn test_press_shifted_character_brackets_with_shift() {
        let kb = keyboard();
        kb.press_key('<').unwrap();
        kb.release_key('<').unwrap();
        assert_eq!(
            kb.platform().take_key_events(),
            vec![(SHIFT, true), (59, true), (59, false), (SHIFT, false)]
        );
    }

    #[test]
    fn test_tap_key_repeats() {
        let kb = keyboard();
        kb.tap_key("Return", 3, Duration::ZERO).unwrap();
        assert_eq!(kb.platform().take_key_events().len(), 6);
    }

    #[test]
    fn test_press_keys_releases_in_reverse() {
        let kb = keyboard();
        kb.press_keys(["Control_L", "c"]).unwrap();
        assert_eq!(
            kb.platform().take_key_events(),
            vec![(37, true), (54, true), (54, false), (37, false)]
        );
    }

    #[test]
    fn test_type_mixed_case() {
        assert_eq!(
            typed("Ab"),
            vec![
                (SHIFT, true),
                (38, true),
                (38, false),
                (SHIFT, false),
                (56, true),
                (56, false),
            ]
        );
    }

    #[test]
    fn test_type_same_case_keeps_shift_down() {
        assert_eq!(
            typed("AB"),
            vec![
                (SHIFT, true),
                (38, true),
                (38, false),
                (56, true),
                (56, false),
                (SHIFT, false),
            ]
        );
    }

    #[test]
    fn test_space_does_not_release_shift() {
        let events = typed("A B");
        let shift_presses = events.iter().filter(|e| **e == (SHIFT, true)).count();
        let shift_releases = events.iter().filter(|e| **e == (SHIFT, false)).count();
        assert_eq!((shift_presses, shift_releases), (1, 1));
        assert_eq!(events.last(), Some(&(SHIFT, false)));
    }

    #[test]
    fn test_shifted_punctuation_taps_base_key() {
        // '<' shares keycode 59 with ','
        assert_eq!(
            typed("<"),
            vec![(SHIFT, true), (59, true), (59, false), (SHIFT, false)]
        );
    }

    #[test]
    fn test_shift_never_doubles() {
        let events = typed("Hello, World! ABC def?");
        let mut held = false;
        for (code, pressed) in events.iter().filter(|(code, _)| *code == SHIFT) {
            assert_eq!(*code, SHIFT);
            assert_ne!(held, *pressed, "shift toggled twice in a row");
            held = *pressed;
        }
        assert!(!held);
    }

    #[test]
    fn test_unknown_character_types_nothing() {
        let kb = keyboard();
        let err = kb.type_string("ok🜁", Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::UnknownSymbol(_)));
        assert!(kb.platform().take_key_events().is_empty());
    }
}
