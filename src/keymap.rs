//! Keysym/keycode resolution tables.
//!
//! A [`KeyTable`] is built once from a [`KeyboardLayout`] and is immutable
//! afterwards. It answers both directions: which keycode (and which
//! modifiers) produce a symbol, and which keysym a keycode produces under a
//! given modifier mask.

use crate::error::{Error, Result};
use crate::event::{KeyCode, KeySymbol};
use crate::keysym::{self, Keysym};
use crate::modifier::{LockStyle, Modifier, ModifierKeycodes, ModifierSet, ModifierTracker};
use crate::platform::KeyboardLayout;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// What the Lock modifier means on this layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMeaning {
    /// Lock affects letters only.
    CapsLock,
    /// Lock acts like a latched Shift.
    ShiftLock,
    /// No key in the Lock group carries a lock keysym.
    None,
}

/// Keysyms the platform is asked about directly: special keys, keypad,
/// function keys and modifiers.
fn well_known_keysyms() -> impl Iterator<Item = Keysym> {
    let special = [
        0xff08, 0xff09, 0xff0a, 0xff0b, 0xff0d, 0xff13, 0xff14, 0xff15, 0xff1b, 0xffff, 0xff50,
        0xff51, 0xff52, 0xff53, 0xff54, 0xff55, 0xff56, 0xff57, 0xff58, 0xff60, 0xff61, 0xff62,
        0xff63, 0xff65, 0xff66, 0xff67, 0xff68, 0xff69, 0xff6a, 0xff6b, 0xff7e, 0xff7f,
    ];
    let keypad = Keysym::KP_SPACE.0..=Keysym::KP_EQUAL.0;
    let function = Keysym::F1.0..Keysym::F1.0 + 35;
    let modifiers = Keysym::SHIFT_L.0..=0xffee;
    special
        .into_iter()
        .chain(keypad)
        .chain(function)
        .chain(modifiers)
        .map(Keysym)
}

/// Resolution tables for one keyboard layout.
#[derive(Debug, Clone)]
pub struct KeyTable {
    rows: BTreeMap<KeyCode, Vec<Keysym>>,
    index: HashMap<Keysym, (KeyCode, usize)>,
    well_known: HashMap<Keysym, KeyCode>,
    modifiers: ModifierKeycodes,
    lock_style: LockStyle,
    lock_meaning: LockMeaning,
    num_lock_mask: ModifierSet,
    mode_switch_mask: ModifierSet,
    lock_keys: Vec<KeyCode>,
}

impl KeyTable {
    /// Query `layout` and build the tables.
    pub fn build<L: KeyboardLayout + ?Sized>(layout: &L) -> Result<Self> {
        let mut rows = BTreeMap::new();
        for code in layout.keycode_range() {
            let mut row = layout.keycode_to_keysyms(code);
            while row.last() == Some(&Keysym::NO_SYMBOL) {
                row.pop();
            }
            if !row.is_empty() {
                rows.insert(code, row);
            }
        }

        let modifiers = layout.modifier_keycodes()?;

        let carries = |code: &KeyCode, sym: Keysym| {
            rows.get(code)
                .is_some_and(|row: &Vec<Keysym>| row.contains(&sym))
        };

        let lock_group = modifiers.group(Modifier::Lock);
        let lock_meaning = if lock_group.iter().any(|c| carries(c, Keysym::CAPS_LOCK)) {
            LockMeaning::CapsLock
        } else if lock_group.iter().any(|c| carries(c, Keysym::SHIFT_LOCK)) {
            LockMeaning::ShiftLock
        } else {
            LockMeaning::None
        };

        let mut num_lock_mask = ModifierSet::EMPTY;
        let mut mode_switch_mask = ModifierSet::EMPTY;
        let mut lock_keys = Vec::new();
        for (modifier, codes) in modifiers.iter() {
            for code in codes {
                if carries(code, Keysym::NUM_LOCK) {
                    num_lock_mask.insert(modifier.mask());
                    lock_keys.push(*code);
                }
                if carries(code, Keysym::MODE_SWITCH) {
                    mode_switch_mask.insert(modifier.mask());
                }
                if modifier == Modifier::Lock
                    && (carries(code, Keysym::CAPS_LOCK) || carries(code, Keysym::SHIFT_LOCK))
                {
                    lock_keys.push(*code);
                }
            }
        }

        // Lower column wins, then lower keycode. Group 2 columns only count
        // when something can select the group.
        let columns = if mode_switch_mask.is_empty() { 2 } else { 4 };
        let mut index = HashMap::new();
        for column in 0..columns {
            for (code, row) in &rows {
                if let Some(sym) = row.get(column).copied()
                    && sym != Keysym::NO_SYMBOL
                {
                    index.entry(sym).or_insert((*code, column));
                }
            }
        }

        let well_known = well_known_keysyms()
            .filter_map(|sym| layout.keysym_to_keycode(sym).map(|code| (sym, code)))
            .collect::<HashMap<_, _>>();

        debug!(
            "built key table: {} keycodes, {} keysyms, lock {:?}, num lock {:?}, mode switch {:?}",
            rows.len(),
            index.len(),
            lock_meaning,
            num_lock_mask,
            mode_switch_mask
        );

        Ok(Self {
            rows,
            index,
            well_known,
            modifiers,
            lock_style: layout.lock_style(),
            lock_meaning,
            num_lock_mask,
            mode_switch_mask,
            lock_keys,
        })
    }

    /// The keysym a logical key stands for.
    pub fn keysym_for(&self, symbol: &KeySymbol) -> Result<Keysym> {
        let found = match symbol {
            KeySymbol::Char(c) => Keysym::from_char(*c),
            KeySymbol::Named(name) => Keysym::from_name(name)
                .or_else(|| keysym::alias_target(name).and_then(Keysym::from_name))
                .or_else(|| {
                    let mut chars = name.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Keysym::from_char(c),
                        _ => None,
                    }
                }),
            KeySymbol::Code(code) => self
                .keysyms(*code)
                .first()
                .copied(),
            KeySymbol::Unknown(sym) => Some(*sym),
        };
        found.ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))
    }

    /// Resolve a logical key to the keycode that produces it.
    pub fn resolve(&self, symbol: &KeySymbol) -> Result<KeyCode> {
        self.resolve_with_modifiers(symbol).map(|(code, _)| code)
    }

    /// Resolve a logical key to its keycode plus the modifiers the layout
    /// needs held to produce it.
    pub fn resolve_with_modifiers(&self, symbol: &KeySymbol) -> Result<(KeyCode, ModifierSet)> {
        if let KeySymbol::Code(code) = symbol {
            return Ok((*code, ModifierSet::EMPTY));
        }
        let sym = self.keysym_for(symbol)?;
        let (code, column) = self
            .keycode_for_keysym(sym)
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))?;
        let required = match column {
            0 => ModifierSet::EMPTY,
            1 => ModifierSet::SHIFT,
            2 => self.mode_switch_mask,
            _ => ModifierSet::SHIFT | self.mode_switch_mask,
        };
        Ok((code, required))
    }

    /// The keycode and row column producing `sym`.
    pub fn keycode_for_keysym(&self, sym: Keysym) -> Option<(KeyCode, usize)> {
        if let Some(code) = self.well_known.get(&sym) {
            let column = self
                .keysyms(*code)
                .iter()
                .position(|s| *s == sym)
                .unwrap_or(0);
            return Some((*code, column));
        }
        self.index.get(&sym).copied()
    }

    /// The keysym `code` produces under `state`.
    ///
    /// Follows the core X protocol rules: the second group is used when
    /// Mode_switch is active and the key has one, Num Lock flips keypad keys,
    /// Caps Lock uppercases letters only, Shift and Shift Lock select the
    /// shifted column.
    pub fn lookup_keysym(&self, code: KeyCode, state: ModifierSet) -> Keysym {
        let row = self.keysyms(code);
        let has_group2 = row.len() > 2 && row[2..].iter().any(|s| *s != Keysym::NO_SYMBOL);
        let offset = if has_group2 && state.intersects(self.mode_switch_mask) {
            2
        } else {
            0
        };
        let column = |i: usize| row.get(offset + i).copied().unwrap_or(Keysym::NO_SYMBOL);
        let (first, second) = (column(0), column(1));
        let (lower, upper) = if second == Keysym::NO_SYMBOL {
            (first.to_lower(), first.to_upper())
        } else {
            (first, second)
        };

        let shift = state.has(Modifier::Shift);
        let lock = state.has(Modifier::Lock);

        if state.intersects(self.num_lock_mask) && upper.is_keypad() {
            if shift || (lock && self.lock_meaning == LockMeaning::ShiftLock) {
                lower
            } else {
                upper
            }
        } else if !shift && (!lock || self.lock_meaning == LockMeaning::None) {
            lower
        } else if !lock || self.lock_meaning != LockMeaning::CapsLock {
            upper
        } else {
            let sym = if second == Keysym::NO_SYMBOL { first } else { second };
            if !shift && sym != first && (sym != sym.to_upper() || !sym.is_alphabetic()) {
                first.to_upper()
            } else {
                sym.to_upper()
            }
        }
    }

    /// The keysym row of a keycode; empty if it produces nothing.
    pub fn keysyms(&self, code: KeyCode) -> &[Keysym] {
        self.rows.get(&code).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn modifier_keycodes(&self) -> &ModifierKeycodes {
        &self.modifiers
    }

    /// First keycode bound to a modifier.
    pub fn modifier_keycode(&self, modifier: Modifier) -> Option<KeyCode> {
        self.modifiers.group(modifier).first().copied()
    }

    /// Keycodes with lock semantics: Caps Lock, Shift Lock and Num Lock keys
    /// bound to a modifier.
    pub fn lock_keycodes(&self) -> &[KeyCode] {
        &self.lock_keys
    }

    pub fn lock_meaning(&self) -> LockMeaning {
        self.lock_meaning
    }

    pub fn lock_style(&self) -> LockStyle {
        self.lock_style
    }

    /// Modifier bits that carry Num Lock.
    pub fn num_lock_mask(&self) -> ModifierSet {
        self.num_lock_mask
    }

    /// Modifier bits that select the second keyboard group.
    pub fn mode_switch_mask(&self) -> ModifierSet {
        self.mode_switch_mask
    }

    pub fn escape_keycode(&self) -> Option<KeyCode> {
        self.keycode_for_keysym(Keysym::ESCAPE)
            .map(|(code, _)| code)
    }

    pub fn shift_keycode(&self) -> Option<KeyCode> {
        self.modifier_keycode(Modifier::Shift)
            .or_else(|| self.keycode_for_keysym(Keysym::SHIFT_L).map(|(code, _)| code))
    }

    /// The key that selects the second group, if the layout has one bound.
    pub fn mode_switch_keycode(&self) -> Option<KeyCode> {
        self.mode_switch_mask.iter().find_map(|modifier| {
            self.modifiers
                .group(modifier)
                .iter()
                .copied()
                .find(|code| self.keysyms(*code).contains(&Keysym::MODE_SWITCH))
        })
    }

    /// A fresh modifier tracker for this layout, all modifiers clear.
    pub fn modifier_tracker(&self) -> ModifierTracker {
        ModifierTracker::new(
            self.modifiers.clone(),
            self.lock_keys.iter().copied(),
            self.lock_style,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::UsLayout;
    use std::ops::RangeInclusive;

    /// A small layout with a second group on keycode 38 and a Shift_Lock key.
    struct GroupLayout;

    impl KeyboardLayout for GroupLayout {
        fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
            (10..=14).find(|code| self.keycode_to_keysyms(*code).first() == Some(&keysym))
        }

        fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
            let row: &[u32] = match code {
                10 => &[0x61, 0x41, 0xe4, 0xc4],
                11 => &[0xffe1],
                12 => &[0xffe6],
                13 => &[0xff7e],
                14 => &[0x31, 0x21],
                _ => &[],
            };
            row.iter().copied().map(Keysym).collect()
        }

        fn keycode_range(&self) -> RangeInclusive<KeyCode> {
            8..=20
        }

        fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
            Ok(ModifierKeycodes::new()
                .with(Modifier::Shift, [11])
                .with(Modifier::Lock, [12])
                .with(Modifier::Mod5, [13]))
        }

        fn lock_style(&self) -> LockStyle {
            LockStyle::ToggleOnPress
        }
    }

    fn us() -> KeyTable {
        KeyTable::build(&UsLayout::new()).unwrap()
    }

    fn sym(c: char) -> Keysym {
        Keysym(c as u32)
    }

    #[test]
    fn test_resolve_characters_and_names() {
        let table = us();
        assert_eq!(table.resolve(&'a'.into()).unwrap(), 38);
        assert_eq!(table.resolve(&'A'.into()).unwrap(), 38);
        assert_eq!(table.resolve(&'!'.into()).unwrap(), 10);
        assert_eq!(table.resolve(&'\n'.into()).unwrap(), 36);
        assert_eq!(table.resolve(&'\t'.into()).unwrap(), 23);
        assert_eq!(table.resolve(&"Return".into()).unwrap(), 36);
        assert_eq!(table.resolve(&"Enter".into()).unwrap(), 36);
        assert_eq!(table.resolve(&"KP_Enter".into()).unwrap(), 104);
        assert_eq!(table.resolve(&"F5".into()).unwrap(), 71);
        assert_eq!(table.resolve(&"Shift_L".into()).unwrap(), 50);
        assert_eq!(table.resolve(&"PageUp".into()).unwrap(), 112);
        assert_eq!(table.resolve(&KeySymbol::Code(999)).unwrap(), 999);
    }

    #[test]
    fn test_resolve_reports_required_modifiers() {
        let table = us();
        assert_eq!(
            table.resolve_with_modifiers(&'a'.into()).unwrap(),
            (38, ModifierSet::EMPTY)
        );
        assert_eq!(
            table.resolve_with_modifiers(&'A'.into()).unwrap(),
            (38, ModifierSet::SHIFT)
        );
        assert_eq!(
            table.resolve_with_modifiers(&'?'.into()).unwrap(),
            (61, ModifierSet::SHIFT)
        );
    }

    #[test]
    fn test_unknown_symbol_is_an_error() {
        let table = us();
        assert!(matches!(
            table.resolve(&'🜁'.into()),
            Err(Error::UnknownSymbol(_))
        ));
        assert!(matches!(
            table.resolve(&"NoSuchKey".into()),
            Err(Error::UnknownSymbol(_))
        ));
        assert!(matches!(
            table.resolve(&'\u{1}'.into()),
            Err(Error::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_derived_masks() {
        let table = us();
        assert_eq!(table.lock_meaning(), LockMeaning::CapsLock);
        assert_eq!(table.num_lock_mask(), ModifierSet::MOD2);
        assert_eq!(table.mode_switch_mask(), ModifierSet::MOD5);
        assert_eq!(table.escape_keycode(), Some(9));
        assert_eq!(table.shift_keycode(), Some(50));
        assert_eq!(table.mode_switch_keycode(), Some(203));
        let mut locks = table.lock_keycodes().to_vec();
        locks.sort_unstable();
        assert_eq!(locks, vec![66, 77]);
    }

    #[test]
    fn test_lookup_shift_and_caps() {
        let table = us();
        assert_eq!(table.lookup_keysym(38, ModifierSet::EMPTY), sym('a'));
        assert_eq!(table.lookup_keysym(38, ModifierSet::SHIFT), sym('A'));
        assert_eq!(table.lookup_keysym(38, ModifierSet::LOCK), sym('A'));
        // Caps Lock leaves symbols alone.
        assert_eq!(table.lookup_keysym(10, ModifierSet::LOCK), sym('1'));
        assert_eq!(table.lookup_keysym(10, ModifierSet::SHIFT), sym('!'));
        assert_eq!(
            table.lookup_keysym(10, ModifierSet::SHIFT | ModifierSet::LOCK),
            sym('!')
        );
        assert_eq!(table.lookup_keysym(94, ModifierSet::EMPTY), Keysym::NO_SYMBOL);
    }

    #[test]
    fn test_lookup_num_lock_keypad() {
        let table = us();
        let kp_home = Keysym::from_name("KP_Home").unwrap();
        let kp_7 = Keysym::from_name("KP_7").unwrap();
        assert_eq!(table.lookup_keysym(79, ModifierSet::EMPTY), kp_home);
        assert_eq!(table.lookup_keysym(79, ModifierSet::MOD2), kp_7);
        assert_eq!(
            table.lookup_keysym(79, ModifierSet::MOD2 | ModifierSet::SHIFT),
            kp_home
        );
        // Num Lock does not touch the main block.
        assert_eq!(table.lookup_keysym(38, ModifierSet::MOD2), sym('a'));
    }

    #[test]
    fn test_group_two_and_shift_lock() {
        let table = KeyTable::build(&GroupLayout).unwrap();
        assert_eq!(table.lock_meaning(), LockMeaning::ShiftLock);
        assert_eq!(table.mode_switch_mask(), ModifierSet::MOD5);
        assert_eq!(table.mode_switch_keycode(), Some(13));

        assert_eq!(table.lookup_keysym(10, ModifierSet::MOD5), Keysym(0xe4));
        assert_eq!(
            table.lookup_keysym(10, ModifierSet::MOD5 | ModifierSet::SHIFT),
            Keysym(0xc4)
        );
        // Shift Lock shifts symbols too.
        assert_eq!(table.lookup_keysym(14, ModifierSet::LOCK), sym('!'));

        assert_eq!(
            table.resolve_with_modifiers(&'ä'.into()).unwrap(),
            (10, ModifierSet::MOD5)
        );
        assert_eq!(
            table.resolve_with_modifiers(&'Ä'.into()).unwrap(),
            (10, ModifierSet::SHIFT | ModifierSet::MOD5)
        );
    }

    #[test]
    fn test_group_two_ignored_without_mode_switch_key() {
        struct NoSwitch;
        impl KeyboardLayout for NoSwitch {
            fn keysym_to_keycode(&self, _: Keysym) -> Option<KeyCode> {
                None
            }
            fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
                GroupLayout.keycode_to_keysyms(code)
            }
            fn keycode_range(&self) -> RangeInclusive<KeyCode> {
                8..=20
            }
            fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
                Ok(ModifierKeycodes::new().with(Modifier::Shift, [11]))
            }
            fn lock_style(&self) -> LockStyle {
                LockStyle::ToggleOnPress
            }
        }

        let table = KeyTable::build(&NoSwitch).unwrap();
        assert!(table.mode_switch_mask().is_empty());
        assert!(table.resolve(&'ä'.into()).is_err());
        assert_eq!(table.lock_meaning(), LockMeaning::None);
    }
}
