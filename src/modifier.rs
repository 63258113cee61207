//! Modifier masks and live modifier state tracking.
//!
//! Bits follow the X11 core protocol layout so that masks read from an X
//! server can be used directly.

use crate::event::KeyCode;
use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the eight modifier slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Modifier {
    Shift,
    /// Caps Lock or Shift Lock, depending on the layout.
    Lock,
    Control,
    /// Mod1.
    Alt,
    /// Usually Num Lock.
    Mod2,
    Mod3,
    /// Usually Super / Windows / Command.
    Mod4,
    /// Usually ISO_Level3_Shift or Mode_switch.
    Mod5,
}

impl Modifier {
    /// Super, Windows and Command keys live in Mod4.
    pub const SUPER: Modifier = Modifier::Mod4;

    /// All modifiers in mask-bit order.
    pub const ALL: [Modifier; 8] = [
        Modifier::Shift,
        Modifier::Lock,
        Modifier::Control,
        Modifier::Alt,
        Modifier::Mod2,
        Modifier::Mod3,
        Modifier::Mod4,
        Modifier::Mod5,
    ];

    /// Position of this modifier in the mask.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Modifier at a mask position, if the position is valid.
    pub fn from_index(index: usize) -> Option<Modifier> {
        Self::ALL.get(index).copied()
    }

    /// The single-bit mask of this modifier.
    pub fn mask(self) -> ModifierSet {
        ModifierSet(1 << self.index())
    }
}

/// A bit-mask of modifiers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub const EMPTY: ModifierSet = ModifierSet(0);
    pub const SHIFT: ModifierSet = ModifierSet(1 << 0);
    pub const LOCK: ModifierSet = ModifierSet(1 << 1);
    pub const CONTROL: ModifierSet = ModifierSet(1 << 2);
    pub const ALT: ModifierSet = ModifierSet(1 << 3);
    pub const MOD2: ModifierSet = ModifierSet(1 << 4);
    pub const MOD3: ModifierSet = ModifierSet(1 << 5);
    pub const MOD4: ModifierSet = ModifierSet(1 << 6);
    pub const MOD5: ModifierSet = ModifierSet(1 << 7);

    /// Build a set from raw mask bits.
    pub const fn from_bits(bits: u8) -> Self {
        ModifierSet(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: ModifierSet) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set in `self`.
    pub const fn intersects(self, other: ModifierSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn has(self, modifier: Modifier) -> bool {
        self.intersects(modifier.mask())
    }

    pub fn insert(&mut self, other: ModifierSet) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ModifierSet) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn union(self, other: ModifierSet) -> ModifierSet {
        ModifierSet(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: ModifierSet) -> ModifierSet {
        ModifierSet(self.0 & !other.0)
    }

    /// Iterate over the modifiers present in the set.
    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.has(*m))
    }
}

impl From<Modifier> for ModifierSet {
    fn from(modifier: Modifier) -> Self {
        modifier.mask()
    }
}

impl std::ops::BitOr for ModifierSet {
    type Output = ModifierSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ModifierSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Debug for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The keycodes bound to each modifier slot, as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierKeycodes {
    groups: [Vec<KeyCode>; 8],
}

impl ModifierKeycodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: bind `codes` to `modifier`.
    pub fn with(mut self, modifier: Modifier, codes: impl IntoIterator<Item = KeyCode>) -> Self {
        self.add(modifier, codes);
        self
    }

    /// Bind additional keycodes to a modifier. Zero keycodes are skipped.
    pub fn add(&mut self, modifier: Modifier, codes: impl IntoIterator<Item = KeyCode>) {
        let group = &mut self.groups[modifier.index()];
        for code in codes {
            if code != 0 && !group.contains(&code) {
                group.push(code);
            }
        }
    }

    pub fn group(&self, modifier: Modifier) -> &[KeyCode] {
        &self.groups[modifier.index()]
    }

    /// The modifier a keycode is bound to. The lowest slot wins if several claim it.
    pub fn modifier_of(&self, code: KeyCode) -> Option<Modifier> {
        Modifier::ALL
            .into_iter()
            .find(|m| self.groups[m.index()].contains(&code))
    }

    pub fn is_modifier(&self, code: KeyCode) -> bool {
        self.modifier_of(code).is_some()
    }

    /// Iterate `(modifier, keycodes)` pairs in mask order.
    pub fn iter(&self) -> impl Iterator<Item = (Modifier, &[KeyCode])> {
        Modifier::ALL
            .into_iter()
            .map(move |m| (m, self.groups[m.index()].as_slice()))
    }
}

/// How lock-type modifier keys change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LockStyle {
    /// Every press flips the lock; releases never change it.
    ToggleOnPress,
    /// A press latches an unlocked lock and its release is ignored; a press
    /// of a latched lock arms it and the following release unlocks.
    UnlockOnRelease,
}

/// Live modifier state driven by observed key events.
///
/// Only keycodes bound in [`ModifierKeycodes`] affect the state. Auto-repeat
/// presses of a key already held down are ignored.
#[derive(Debug, Clone)]
pub struct ModifierTracker {
    keycodes: ModifierKeycodes,
    lock_keys: HashSet<KeyCode>,
    style: LockStyle,
    held: Vec<(KeyCode, Modifier)>,
    latched: ModifierSet,
    armed: HashSet<KeyCode>,
}

impl ModifierTracker {
    /// Create a tracker with all modifiers clear.
    ///
    /// `lock_keys` are the keycodes with lock semantics (Caps Lock, Shift Lock,
    /// Num Lock); every other bound keycode follows press/release symmetry.
    pub fn new(
        keycodes: ModifierKeycodes,
        lock_keys: impl IntoIterator<Item = KeyCode>,
        style: LockStyle,
    ) -> Self {
        Self {
            keycodes,
            lock_keys: lock_keys.into_iter().collect(),
            style,
            held: Vec::new(),
            latched: ModifierSet::EMPTY,
            armed: HashSet::new(),
        }
    }

    /// Feed one key event. Returns the modifier the key is bound to, if any.
    pub fn update(&mut self, code: KeyCode, pressed: bool) -> Option<Modifier> {
        let modifier = self.keycodes.modifier_of(code)?;
        let repeat = pressed && self.held.iter().any(|(held, _)| *held == code);

        if pressed {
            if !repeat {
                self.held.push((code, modifier));
            }
        } else {
            self.held.retain(|(held, _)| *held != code);
        }

        if self.lock_keys.contains(&code) && !repeat {
            self.update_lock(code, modifier, pressed);
        }
        Some(modifier)
    }

    fn update_lock(&mut self, code: KeyCode, modifier: Modifier, pressed: bool) {
        let bit = modifier.mask();
        match (self.style, pressed) {
            (LockStyle::ToggleOnPress, true) => {
                if self.latched.intersects(bit) {
                    self.latched.remove(bit);
                } else {
                    self.latched.insert(bit);
                }
            }
            (LockStyle::ToggleOnPress, false) => {}
            (LockStyle::UnlockOnRelease, true) => {
                if self.latched.intersects(bit) {
                    self.armed.insert(code);
                } else {
                    self.latched.insert(bit);
                }
            }
            (LockStyle::UnlockOnRelease, false) => {
                if self.armed.remove(&code) {
                    self.latched.remove(bit);
                }
            }
        }
    }

    /// The current modifier mask.
    pub fn state(&self) -> ModifierSet {
        let mut state = self.latched;
        for (code, modifier) in &self.held {
            if !self.lock_keys.contains(code) {
                state.insert(modifier.mask());
            }
        }
        state
    }

    /// Whether a modifier is currently active.
    pub fn is_set(&self, modifier: Modifier) -> bool {
        self.state().has(modifier)
    }

    /// The current mask with the contribution of `code`'s own modifier removed.
    pub fn state_excluding(&self, code: KeyCode) -> ModifierSet {
        match self.keycodes.modifier_of(code) {
            Some(own) => self.state().without(own.mask()),
            None => self.state(),
        }
    }

    pub fn keycodes(&self) -> &ModifierKeycodes {
        &self.keycodes
    }

    pub fn lock_style(&self) -> LockStyle {
        self.style
    }

    /// Clear every held and latched modifier.
    pub fn reset(&mut self) {
        self.held.clear();
        self.latched = ModifierSet::EMPTY;
        self.armed.clear();
    }
}
