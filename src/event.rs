//! Event and key identifier types shared by the synthesizers and the listener.

use crate::keysym::Keysym;
use crate::modifier::ModifierSet;
use std::borrow::Cow;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Platform-native key identifier. Meaningful only together with the
/// backend that produced it.
pub type KeyCode = u32;

/// A logical key: a character, a named key, or a raw keycode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeySymbol {
    /// A character such as `'a'`, `'!'` or `'\n'`.
    Char(char),
    /// A named key such as `"Return"`, `"Shift_L"` or `"F5"`.
    Named(Cow<'static, str>),
    /// A platform keycode, passed through untouched.
    Code(KeyCode),
    /// A keysym the listener could not name.
    Unknown(Keysym),
}

impl KeySymbol {
    /// Create a named key symbol.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        KeySymbol::Named(name.into())
    }

    /// The character, if this symbol is one.
    pub fn as_char(&self) -> Option<char> {
        match self {
            KeySymbol::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// The key name, if this symbol is a named key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            KeySymbol::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, KeySymbol::Unknown(_))
    }
}

impl From<char> for KeySymbol {
    fn from(c: char) -> Self {
        KeySymbol::Char(c)
    }
}

impl From<&'static str> for KeySymbol {
    fn from(name: &'static str) -> Self {
        KeySymbol::Named(Cow::Borrowed(name))
    }
}

impl From<String> for KeySymbol {
    fn from(name: String) -> Self {
        KeySymbol::Named(Cow::Owned(name))
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySymbol::Char(c) => write!(f, "{c:?}"),
            KeySymbol::Named(name) => f.write_str(name),
            KeySymbol::Code(code) => write!(f, "keycode {code}"),
            KeySymbol::Unknown(sym) => write!(f, "unknown keysym {sym}"),
        }
    }
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Button {
    /// Left mouse button (Button 1).
    Left,
    /// Right mouse button (Button 2).
    Right,
    /// Middle mouse button (Button 3).
    Middle,
    /// Extra button 1 (typically back).
    Button4,
    /// Extra button 2 (typically forward).
    Button5,
    /// Unknown or unsupported button.
    Unknown(u8),
}

impl Button {
    /// Get the button number (1-indexed).
    pub fn number(&self) -> u8 {
        match self {
            Button::Left => 1,
            Button::Right => 2,
            Button::Middle => 3,
            Button::Button4 => 4,
            Button::Button5 => 5,
            Button::Unknown(n) => *n,
        }
    }

    /// Create a Button from a number (1-indexed).
    pub fn from_number(n: u8) -> Self {
        match n {
            1 => Button::Left,
            2 => Button::Right,
            3 => Button::Middle,
            4 => Button::Button4,
            5 => Button::Button5,
            _ => Button::Unknown(n),
        }
    }
}

/// Scroll direction for mouse wheel events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScrollDirection {
    /// Scrolling up (away from user).
    Up,
    /// Scrolling down (toward user).
    Down,
    /// Scrolling left.
    Left,
    /// Scrolling right.
    Right,
}

/// An undecoded event as delivered by a platform event source.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RawEvent {
    Key { code: KeyCode, pressed: bool },
    Button {
        button: Button,
        pressed: bool,
        x: f64,
        y: f64,
    },
    Motion { x: f64, y: f64 },
    Scroll {
        direction: ScrollDirection,
        x: f64,
        y: f64,
    },
}

impl RawEvent {
    pub fn key_pressed(code: KeyCode) -> Self {
        RawEvent::Key {
            code,
            pressed: true,
        }
    }

    pub fn key_released(code: KeyCode) -> Self {
        RawEvent::Key {
            code,
            pressed: false,
        }
    }

    pub fn button_pressed(button: Button, x: f64, y: f64) -> Self {
        RawEvent::Button {
            button,
            pressed: true,
            x,
            y,
        }
    }

    pub fn button_released(button: Button, x: f64, y: f64) -> Self {
        RawEvent::Button {
            button,
            pressed: false,
            x,
            y,
        }
    }

    /// Check if this is a keyboard event.
    pub fn is_keyboard(&self) -> bool {
        matches!(self, RawEvent::Key { .. })
    }

    /// Check if this is a mouse event.
    pub fn is_mouse(&self) -> bool {
        !self.is_keyboard()
    }
}

/// A decoded key event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyEvent {
    /// The raw platform keycode.
    pub code: KeyCode,
    /// The character or key name the code produced under `modifiers`.
    pub symbol: KeySymbol,
    pub pressed: bool,
    /// Modifiers active when the event was decoded, after applying this event.
    pub modifiers: ModifierSet,
}

/// A decoded input event, as handed to listener callbacks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InputEvent {
    Key(KeyEvent),
    Button {
        button: Button,
        pressed: bool,
        x: f64,
        y: f64,
    },
    Motion { x: f64, y: f64 },
    Scroll {
        direction: ScrollDirection,
        x: f64,
        y: f64,
    },
}

impl InputEvent {
    /// The key event, if this is one.
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            InputEvent::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Check if this is a keyboard event.
    pub fn is_keyboard(&self) -> bool {
        matches!(self, InputEvent::Key(_))
    }

    /// Check if this is a mouse event.
    pub fn is_mouse(&self) -> bool {
        !self.is_keyboard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_numbers() {
        for n in 1..=5 {
            assert_eq!(Button::from_number(n).number(), n);
        }
        assert_eq!(Button::from_number(9), Button::Unknown(9));
    }

    #[test]
    fn test_key_symbol_conversions() {
        assert_eq!(KeySymbol::from('a').as_char(), Some('a'));
        assert_eq!(KeySymbol::from("Return").as_name(), Some("Return"));
        assert_eq!(KeySymbol::from(String::from("F5")), KeySymbol::named("F5"));
        assert!(KeySymbol::Unknown(Keysym(0x1234)).is_unknown());
        assert_eq!(KeySymbol::named("Tab").to_string(), "Tab");
    }

    #[test]
    fn test_raw_event_classification() {
        assert!(RawEvent::key_pressed(38).is_keyboard());
        assert!(RawEvent::button_pressed(Button::Left, 0.0, 0.0).is_mouse());
        assert!(RawEvent::Motion { x: 1.0, y: 2.0 }.is_mouse());
    }
}
