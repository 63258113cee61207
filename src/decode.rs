//! Keycode to character/name decoding for captured key events.

use crate::error::{Error, Result};
use crate::event::{KeyCode, KeyEvent, KeySymbol};
use crate::keymap::KeyTable;
use crate::keysym::Keysym;
use crate::modifier::{ModifierSet, ModifierTracker};
use log::debug;
use std::borrow::Cow;

/// Turns raw key events into [`KeyEvent`]s, tracking live modifier state.
#[derive(Debug, Clone)]
pub struct Decoder {
    table: KeyTable,
    tracker: ModifierTracker,
}

impl Decoder {
    pub fn new(table: KeyTable) -> Self {
        let tracker = table.modifier_tracker();
        Self { table, tracker }
    }

    /// Decode `code` under an explicit modifier mask.
    ///
    /// Printable ASCII comes back as [`KeySymbol::Char`], anything else the
    /// keysym name table knows as [`KeySymbol::Named`]. Keysyms outside
    /// Latin-1 without a name come back as their character.
    pub fn decode(&self, code: KeyCode, state: ModifierSet) -> Result<KeySymbol> {
        let keysym = self.table.lookup_keysym(code, state);
        symbol_for(keysym).ok_or(Error::UnresolvedKeycode {
            keycode: code,
            keysym,
        })
    }

    /// Feed one raw key event: update modifier state, then decode the key with
    /// its own modifier masked out.
    ///
    /// Keycodes that cannot be named decode to [`KeySymbol::Unknown`].
    pub fn decode_event(&mut self, code: KeyCode, pressed: bool) -> KeyEvent {
        self.tracker.update(code, pressed);
        let state = self.tracker.state_excluding(code);
        let symbol = match self.decode(code, state) {
            Ok(symbol) => symbol,
            Err(err) => {
                debug!("{err}");
                KeySymbol::Unknown(self.table.lookup_keysym(code, state))
            }
        };
        KeyEvent {
            code,
            symbol,
            pressed,
            modifiers: self.tracker.state(),
        }
    }

    /// The live modifier mask.
    pub fn modifiers(&self) -> ModifierSet {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &ModifierTracker {
        &self.tracker
    }

    pub fn table(&self) -> &KeyTable {
        &self.table
    }

    /// Forget all held and latched modifiers.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

fn symbol_for(keysym: Keysym) -> Option<KeySymbol> {
    if keysym == Keysym::NO_SYMBOL {
        return None;
    }
    if keysym.is_ascii_printable() {
        return char::from_u32(keysym.0).map(KeySymbol::Char);
    }
    if let Some(name) = keysym.name() {
        return Some(KeySymbol::Named(Cow::Borrowed(name)));
    }
    if keysym.0 > 0xff {
        return keysym.to_char().map(KeySymbol::Char);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::UsLayout;

    fn decoder() -> Decoder {
        Decoder::new(KeyTable::build(&UsLayout::new()).unwrap())
    }

    #[test]
    fn test_printable_ascii_round_trip() {
        let d = decoder();
        for c in (0x20u8..=0x7e).map(char::from) {
            let (code, mods) = d.table().resolve_with_modifiers(&c.into()).unwrap();
            assert_eq!(d.decode(code, mods).unwrap(), KeySymbol::Char(c), "{c:?}");
        }
    }

    #[test]
    fn test_named_keys() {
        let d = decoder();
        assert_eq!(
            d.decode(36, ModifierSet::EMPTY).unwrap(),
            KeySymbol::named("Return")
        );
        assert_eq!(
            d.decode(50, ModifierSet::EMPTY).unwrap(),
            KeySymbol::named("Shift_L")
        );
        assert_eq!(
            d.decode(23, ModifierSet::SHIFT).unwrap(),
            KeySymbol::named("ISO_Left_Tab")
        );
    }

    #[test]
    fn test_unmapped_keycode_is_reported() {
        let d = decoder();
        assert!(matches!(
            d.decode(94, ModifierSet::EMPTY),
            Err(Error::UnresolvedKeycode { keycode: 94, .. })
        ));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let d = decoder();
        let state = ModifierSet::SHIFT | ModifierSet::MOD2;
        for code in [10, 38, 79, 94] {
            let first = d.decode(code, state).ok();
            let second = d.decode(code, state).ok();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_decode_event_tracks_shift() {
        let mut d = decoder();
        let shift = d.decode_event(50, true);
        assert_eq!(shift.symbol, KeySymbol::named("Shift_L"));
        assert_eq!(shift.modifiers, ModifierSet::SHIFT);

        let a = d.decode_event(38, true);
        assert_eq!(a.symbol, KeySymbol::Char('A'));
        d.decode_event(38, false);

        d.decode_event(50, false);
        assert_eq!(d.decode_event(38, true).symbol, KeySymbol::Char('a'));
    }

    #[test]
    fn test_decode_event_caps_lock() {
        let mut d = decoder();
        d.decode_event(66, true);
        d.decode_event(66, false);
        assert_eq!(d.decode_event(38, true).symbol, KeySymbol::Char('A'));
        assert_eq!(d.decode_event(10, true).symbol, KeySymbol::Char('1'));
    }

    #[test]
    fn test_decode_event_unknown_keycode() {
        let mut d = decoder();
        let event = d.decode_event(94, true);
        assert_eq!(event.symbol, KeySymbol::Unknown(Keysym::NO_SYMBOL));
    }
}
