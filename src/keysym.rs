//! Keysyms: layout-independent symbolic key identifiers.
//!
//! The X11 keysym encoding is used as the common vocabulary on every
//! platform. Latin-1 characters are their own keysym, other Unicode
//! characters live at `0x0100_0000 + codepoint`, and named keys such as
//! `Return` or `Shift_L` occupy the `0xff00` page.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A platform-level symbolic name for a logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keysym(pub u32);

const UNICODE_OFFSET: u32 = 0x0100_0000;

impl Keysym {
    pub const NO_SYMBOL: Keysym = Keysym(0);

    pub const BACKSPACE: Keysym = Keysym(0xff08);
    pub const TAB: Keysym = Keysym(0xff09);
    pub const RETURN: Keysym = Keysym(0xff0d);
    pub const ESCAPE: Keysym = Keysym(0xff1b);
    pub const DELETE: Keysym = Keysym(0xffff);
    pub const MODE_SWITCH: Keysym = Keysym(0xff7e);
    pub const NUM_LOCK: Keysym = Keysym(0xff7f);
    pub const KP_SPACE: Keysym = Keysym(0xff80);
    pub const KP_EQUAL: Keysym = Keysym(0xffbd);
    pub const F1: Keysym = Keysym(0xffbe);
    pub const SHIFT_L: Keysym = Keysym(0xffe1);
    pub const SHIFT_R: Keysym = Keysym(0xffe2);
    pub const CONTROL_L: Keysym = Keysym(0xffe3);
    pub const CAPS_LOCK: Keysym = Keysym(0xffe5);
    pub const SHIFT_LOCK: Keysym = Keysym(0xffe6);
    pub const ALT_L: Keysym = Keysym(0xffe9);
    pub const SUPER_L: Keysym = Keysym(0xffeb);

    /// Look up a keysym by its X11 name (`"Return"`, `"KP_5"`, `"a"`).
    pub fn from_name(name: &str) -> Option<Keysym> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && c.is_ascii_alphanumeric()
        {
            return Some(Keysym(c as u32));
        }
        NAME_TO_KEYSYM.get(name).copied()
    }

    /// The X11 name of this keysym, if it has one in the name table.
    pub fn name(self) -> Option<&'static str> {
        KEYSYM_TO_NAME.get(&self).copied()
    }

    /// Map a character to the keysym that produces it.
    ///
    /// Letters and digits map directly, punctuation and control characters go
    /// through the special-character table, everything else uses the Latin-1
    /// or Unicode keysym ranges.
    pub fn from_char(c: char) -> Option<Keysym> {
        if c.is_ascii_alphanumeric() {
            return Some(Keysym(c as u32));
        }
        if let Some(name) = special_char_name(c) {
            return Keysym::from_name(name);
        }
        match c as u32 {
            0xa0..=0xff => Some(Keysym(c as u32)),
            cp if cp >= 0x100 => Some(Keysym(UNICODE_OFFSET + cp)),
            _ => None,
        }
    }

    /// The character this keysym types, if it types one.
    pub fn to_char(self) -> Option<char> {
        match self.0 {
            0x20..=0x7e | 0xa0..=0xff => char::from_u32(self.0),
            0xff08 => Some('\u{8}'),
            0xff09 => Some('\t'),
            0xff0d => Some('\r'),
            0xff1b => Some('\u{1b}'),
            k if (UNICODE_OFFSET + 0x100..=UNICODE_OFFSET + 0x10_ffff).contains(&k) => {
                char::from_u32(k - UNICODE_OFFSET)
            }
            _ => None,
        }
    }

    /// Whether the keysym is printable ASCII as far as key decoding is concerned.
    ///
    /// Tab, line feed and carriage return count as printable.
    pub fn is_ascii_printable(self) -> bool {
        matches!(self.0, 9 | 10 | 13 | 0x20..=0x7e)
    }

    /// Whether the keysym lives on the numeric keypad.
    pub fn is_keypad(self) -> bool {
        (Self::KP_SPACE.0..=Self::KP_EQUAL.0).contains(&self.0)
    }

    /// Whether the keysym is a modifier key (`Shift_L` .. `Hyper_R`, `Mode_switch`, `Num_Lock`).
    pub fn is_modifier(self) -> bool {
        matches!(self.0, 0xffe1..=0xffee | 0xff7e | 0xff7f | 0xfe01..=0xfe13)
    }

    /// Whether the keysym is a letter with distinct upper and lower case forms.
    pub fn is_alphabetic(self) -> bool {
        self.to_lower() != self.to_upper()
    }

    /// Uppercase form of an alphabetic keysym; other keysyms are returned unchanged.
    pub fn to_upper(self) -> Keysym {
        match self.0 {
            0x61..=0x7a => Keysym(self.0 - 0x20),
            0xe0..=0xfe if self.0 != 0xf7 => Keysym(self.0 - 0x20),
            _ => self.map_unicode_case(|c| c.to_uppercase()),
        }
    }

    /// Lowercase form of an alphabetic keysym; other keysyms are returned unchanged.
    pub fn to_lower(self) -> Keysym {
        match self.0 {
            0x41..=0x5a => Keysym(self.0 + 0x20),
            0xc0..=0xde if self.0 != 0xd7 => Keysym(self.0 + 0x20),
            _ => self.map_unicode_case(|c| c.to_lowercase()),
        }
    }

    fn map_unicode_case<I>(self, convert: impl Fn(char) -> I) -> Keysym
    where
        I: Iterator<Item = char>,
    {
        if self.0 < UNICODE_OFFSET + 0x100 {
            return self;
        }
        let Some(c) = self.to_char() else {
            return self;
        };
        let mut converted = convert(c);
        match (converted.next(), converted.next()) {
            (Some(single), None) => Keysym::from_char(single).unwrap_or(self),
            _ => self,
        }
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            f.write_str(name)
        } else if self.is_ascii_printable() && self.0 >= 0x20 {
            write!(f, "{}", self.0 as u8 as char)
        } else {
            write!(f, "0x{:x}", self.0)
        }
    }
}

/// X11 name of a punctuation or control character that cannot be named by
/// itself (`'!'` is `exclam`, `'\n'` is `Return`).
pub fn special_char_name(c: char) -> Option<&'static str> {
    SPECIAL_CHARS
        .iter()
        .find(|(special, _)| *special == c)
        .map(|(_, name)| *name)
}

/// Canonical X11 name for a friendlier alias (`"Enter"` is `Return`).
pub fn alias_target(name: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, target)| *target)
}

const SPECIAL_CHARS: &[(char, &str)] = &[
    (' ', "space"),
    ('\t', "Tab"),
    ('\n', "Return"),
    ('\r', "Return"),
    ('\u{8}', "BackSpace"),
    ('\u{1b}', "Escape"),
    ('!', "exclam"),
    ('#', "numbersign"),
    ('%', "percent"),
    ('$', "dollar"),
    ('&', "ampersand"),
    ('"', "quotedbl"),
    ('\'', "apostrophe"),
    ('(', "parenleft"),
    (')', "parenright"),
    ('*', "asterisk"),
    ('=', "equal"),
    ('+', "plus"),
    (',', "comma"),
    ('-', "minus"),
    ('.', "period"),
    ('/', "slash"),
    (':', "colon"),
    (';', "semicolon"),
    ('<', "less"),
    ('>', "greater"),
    ('?', "question"),
    ('@', "at"),
    ('[', "bracketleft"),
    (']', "bracketright"),
    ('\\', "backslash"),
    ('^', "asciicircum"),
    ('_', "underscore"),
    ('`', "grave"),
    ('{', "braceleft"),
    ('|', "bar"),
    ('}', "braceright"),
    ('~', "asciitilde"),
];

const ALIASES: &[(&str, &str)] = &[
    ("Enter", "Return"),
    ("Esc", "Escape"),
    ("Backspace", "BackSpace"),
    ("Space", "space"),
    ("PageUp", "Page_Up"),
    ("PageDown", "Page_Down"),
    ("Shift", "Shift_L"),
    ("Control", "Control_L"),
    ("Ctrl", "Control_L"),
    ("Alt", "Alt_L"),
    ("AltGr", "ISO_Level3_Shift"),
    ("Super", "Super_L"),
    ("Windows", "Super_L"),
    ("Windows_L", "Super_L"),
    ("Windows_R", "Super_R"),
    ("Command", "Super_L"),
    ("CapsLock", "Caps_Lock"),
    ("Capital", "Caps_Lock"),
    ("NumLock", "Num_Lock"),
    ("ScrollLock", "Scroll_Lock"),
    ("PrintScreen", "Print"),
    ("Snapshot", "Print"),
    ("Apps", "Menu"),
];

// Where two names share a keysym the first one listed is the reverse-lookup name.
const NAMES: &[(&str, u32)] = &[
    // TTY function keys
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Linefeed", 0xff0a),
    ("Clear", 0xff0b),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Scroll_Lock", 0xff14),
    ("Sys_Req", 0xff15),
    ("Escape", 0xff1b),
    ("Delete", 0xffff),
    ("Multi_key", 0xff20),
    // Cursor control
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Page_Up", 0xff55),
    ("Prior", 0xff55),
    ("Page_Down", 0xff56),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Begin", 0xff58),
    // Misc functions
    ("Select", 0xff60),
    ("Print", 0xff61),
    ("Execute", 0xff62),
    ("Insert", 0xff63),
    ("Undo", 0xff65),
    ("Redo", 0xff66),
    ("Menu", 0xff67),
    ("Find", 0xff68),
    ("Cancel", 0xff69),
    ("Help", 0xff6a),
    ("Break", 0xff6b),
    ("Mode_switch", 0xff7e),
    ("script_switch", 0xff7e),
    ("Num_Lock", 0xff7f),
    // Keypad
    ("KP_Space", 0xff80),
    ("KP_Tab", 0xff89),
    ("KP_Enter", 0xff8d),
    ("KP_F1", 0xff91),
    ("KP_F2", 0xff92),
    ("KP_F3", 0xff93),
    ("KP_F4", 0xff94),
    ("KP_Home", 0xff95),
    ("KP_Left", 0xff96),
    ("KP_Up", 0xff97),
    ("KP_Right", 0xff98),
    ("KP_Down", 0xff99),
    ("KP_Page_Up", 0xff9a),
    ("KP_Prior", 0xff9a),
    ("KP_Page_Down", 0xff9b),
    ("KP_Next", 0xff9b),
    ("KP_End", 0xff9c),
    ("KP_Begin", 0xff9d),
    ("KP_Insert", 0xff9e),
    ("KP_Delete", 0xff9f),
    ("KP_Multiply", 0xffaa),
    ("KP_Add", 0xffab),
    ("KP_Separator", 0xffac),
    ("KP_Subtract", 0xffad),
    ("KP_Decimal", 0xffae),
    ("KP_Divide", 0xffaf),
    ("KP_0", 0xffb0),
    ("KP_1", 0xffb1),
    ("KP_2", 0xffb2),
    ("KP_3", 0xffb3),
    ("KP_4", 0xffb4),
    ("KP_5", 0xffb5),
    ("KP_6", 0xffb6),
    ("KP_7", 0xffb7),
    ("KP_8", 0xffb8),
    ("KP_9", 0xffb9),
    ("KP_Equal", 0xffbd),
    // Function keys
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", 0xffc8),
    ("F12", 0xffc9),
    ("F13", 0xffca),
    ("F14", 0xffcb),
    ("F15", 0xffcc),
    ("F16", 0xffcd),
    ("F17", 0xffce),
    ("F18", 0xffcf),
    ("F19", 0xffd0),
    ("F20", 0xffd1),
    ("F21", 0xffd2),
    ("F22", 0xffd3),
    ("F23", 0xffd4),
    ("F24", 0xffd5),
    ("F25", 0xffd6),
    ("F26", 0xffd7),
    ("F27", 0xffd8),
    ("F28", 0xffd9),
    ("F29", 0xffda),
    ("F30", 0xffdb),
    ("F31", 0xffdc),
    ("F32", 0xffdd),
    ("F33", 0xffde),
    ("F34", 0xffdf),
    ("F35", 0xffe0),
    ("L1", 0xffc8),
    ("L2", 0xffc9),
    ("L3", 0xffca),
    ("L4", 0xffcb),
    ("L5", 0xffcc),
    ("L6", 0xffcd),
    ("L7", 0xffce),
    ("L8", 0xffcf),
    ("L9", 0xffd0),
    ("L10", 0xffd1),
    ("R1", 0xffd2),
    ("R2", 0xffd3),
    ("R3", 0xffd4),
    ("R4", 0xffd5),
    ("R5", 0xffd6),
    ("R6", 0xffd7),
    ("R7", 0xffd8),
    ("R8", 0xffd9),
    ("R9", 0xffda),
    ("R10", 0xffdb),
    ("R11", 0xffdc),
    ("R12", 0xffdd),
    ("R13", 0xffde),
    ("R14", 0xffdf),
    ("R15", 0xffe0),
    // Modifiers
    ("Shift_L", 0xffe1),
    ("Shift_R", 0xffe2),
    ("Control_L", 0xffe3),
    ("Control_R", 0xffe4),
    ("Caps_Lock", 0xffe5),
    ("Shift_Lock", 0xffe6),
    ("Meta_L", 0xffe7),
    ("Meta_R", 0xffe8),
    ("Alt_L", 0xffe9),
    ("Alt_R", 0xffea),
    ("Super_L", 0xffeb),
    ("Super_R", 0xffec),
    ("Hyper_L", 0xffed),
    ("Hyper_R", 0xffee),
    ("ISO_Level3_Shift", 0xfe03),
    ("ISO_Left_Tab", 0xfe20),
    // Latin-1, printable ASCII punctuation
    ("space", 0x20),
    ("exclam", 0x21),
    ("quotedbl", 0x22),
    ("numbersign", 0x23),
    ("dollar", 0x24),
    ("percent", 0x25),
    ("ampersand", 0x26),
    ("apostrophe", 0x27),
    ("parenleft", 0x28),
    ("parenright", 0x29),
    ("asterisk", 0x2a),
    ("plus", 0x2b),
    ("comma", 0x2c),
    ("minus", 0x2d),
    ("period", 0x2e),
    ("slash", 0x2f),
    ("colon", 0x3a),
    ("semicolon", 0x3b),
    ("less", 0x3c),
    ("equal", 0x3d),
    ("greater", 0x3e),
    ("question", 0x3f),
    ("at", 0x40),
    ("bracketleft", 0x5b),
    ("backslash", 0x5c),
    ("bracketright", 0x5d),
    ("asciicircum", 0x5e),
    ("underscore", 0x5f),
    ("grave", 0x60),
    ("braceleft", 0x7b),
    ("bar", 0x7c),
    ("braceright", 0x7d),
    ("asciitilde", 0x7e),
    // Latin-1, upper half
    ("nobreakspace", 0xa0),
    ("exclamdown", 0xa1),
    ("cent", 0xa2),
    ("sterling", 0xa3),
    ("currency", 0xa4),
    ("yen", 0xa5),
    ("brokenbar", 0xa6),
    ("section", 0xa7),
    ("diaeresis", 0xa8),
    ("copyright", 0xa9),
    ("ordfeminine", 0xaa),
    ("guillemotleft", 0xab),
    ("notsign", 0xac),
    ("hyphen", 0xad),
    ("registered", 0xae),
    ("macron", 0xaf),
    ("degree", 0xb0),
    ("plusminus", 0xb1),
    ("twosuperior", 0xb2),
    ("threesuperior", 0xb3),
    ("acute", 0xb4),
    ("mu", 0xb5),
    ("paragraph", 0xb6),
    ("periodcentered", 0xb7),
    ("cedilla", 0xb8),
    ("onesuperior", 0xb9),
    ("masculine", 0xba),
    ("guillemotright", 0xbb),
    ("onequarter", 0xbc),
    ("onehalf", 0xbd),
    ("threequarters", 0xbe),
    ("questiondown", 0xbf),
    ("Agrave", 0xc0),
    ("Aacute", 0xc1),
    ("Acircumflex", 0xc2),
    ("Atilde", 0xc3),
    ("Adiaeresis", 0xc4),
    ("Aring", 0xc5),
    ("AE", 0xc6),
    ("Ccedilla", 0xc7),
    ("Egrave", 0xc8),
    ("Eacute", 0xc9),
    ("Ecircumflex", 0xca),
    ("Ediaeresis", 0xcb),
    ("Igrave", 0xcc),
    ("Iacute", 0xcd),
    ("Icircumflex", 0xce),
    ("Idiaeresis", 0xcf),
    ("ETH", 0xd0),
    ("Ntilde", 0xd1),
    ("Ograve", 0xd2),
    ("Oacute", 0xd3),
    ("Ocircumflex", 0xd4),
    ("Otilde", 0xd5),
    ("Odiaeresis", 0xd6),
    ("multiply", 0xd7),
    ("Oslash", 0xd8),
    ("Ugrave", 0xd9),
    ("Uacute", 0xda),
    ("Ucircumflex", 0xdb),
    ("Udiaeresis", 0xdc),
    ("Yacute", 0xdd),
    ("THORN", 0xde),
    ("ssharp", 0xdf),
    ("agrave", 0xe0),
    ("aacute", 0xe1),
    ("acircumflex", 0xe2),
    ("atilde", 0xe3),
    ("adiaeresis", 0xe4),
    ("aring", 0xe5),
    ("ae", 0xe6),
    ("ccedilla", 0xe7),
    ("egrave", 0xe8),
    ("eacute", 0xe9),
    ("ecircumflex", 0xea),
    ("ediaeresis", 0xeb),
    ("igrave", 0xec),
    ("iacute", 0xed),
    ("icircumflex", 0xee),
    ("idiaeresis", 0xef),
    ("eth", 0xf0),
    ("ntilde", 0xf1),
    ("ograve", 0xf2),
    ("oacute", 0xf3),
    ("ocircumflex", 0xf4),
    ("otilde", 0xf5),
    ("odiaeresis", 0xf6),
    ("division", 0xf7),
    ("oslash", 0xf8),
    ("ugrave", 0xf9),
    ("uacute", 0xfa),
    ("ucircumflex", 0xfb),
    ("udiaeresis", 0xfc),
    ("yacute", 0xfd),
    ("thorn", 0xfe),
    ("ydiaeresis", 0xff),
];

static NAME_TO_KEYSYM: LazyLock<HashMap<&'static str, Keysym>> = LazyLock::new(|| {
    NAMES
        .iter()
        .map(|&(name, sym)| (name, Keysym(sym)))
        .collect()
});

static KEYSYM_TO_NAME: LazyLock<HashMap<Keysym, &'static str>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(NAMES.len());
    for &(name, sym) in NAMES {
        map.entry(Keysym(sym)).or_insert(name);
    }
    map
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup_both_ways() {
        assert_eq!(Keysym::from_name("Return"), Some(Keysym::RETURN));
        assert_eq!(Keysym::from_name("a"), Some(Keysym(0x61)));
        assert_eq!(Keysym::from_name("7"), Some(Keysym(0x37)));
        assert_eq!(Keysym::from_name("exclam"), Some(Keysym(0x21)));
        assert_eq!(Keysym::from_name("NoSuchKey"), None);

        assert_eq!(Keysym::RETURN.name(), Some("Return"));
        assert_eq!(Keysym(0xff55).name(), Some("Page_Up"));
        assert_eq!(Keysym(0xffc8).name(), Some("F11"));
    }

    #[test]
    fn test_from_char_uses_special_table() {
        assert_eq!(Keysym::from_char('!'), Some(Keysym(0x21)));
        assert_eq!(Keysym::from_char('\n'), Some(Keysym::RETURN));
        assert_eq!(Keysym::from_char('\t'), Some(Keysym::TAB));
        assert_eq!(Keysym::from_char(' '), Some(Keysym(0x20)));
        assert_eq!(Keysym::from_char('é'), Some(Keysym(0xe9)));
        assert_eq!(Keysym::from_char('€'), Some(Keysym(0x0100_20ac)));
        assert_eq!(Keysym::from_char('\u{1}'), None);
    }

    #[test]
    fn test_to_char_inverts_from_char() {
        for c in ['a', 'Z', '0', '~', 'é', '€'] {
            assert_eq!(Keysym::from_char(c).and_then(Keysym::to_char), Some(c));
        }
        assert_eq!(Keysym::F1.to_char(), None);
    }

    #[test]
    fn test_case_folding_only_touches_letters() {
        assert_eq!(Keysym(0x61).to_upper(), Keysym(0x41));
        assert_eq!(Keysym(0x41).to_lower(), Keysym(0x61));
        assert_eq!(Keysym(0xe9).to_upper(), Keysym(0xc9));
        assert_eq!(Keysym(0x31).to_upper(), Keysym(0x31));
        assert_eq!(Keysym(0xf7).to_upper(), Keysym(0xf7));
        assert!(Keysym(0x61).is_alphabetic());
        assert!(!Keysym(0x21).is_alphabetic());
        assert!(!Keysym::RETURN.is_alphabetic());
    }

    #[test]
    fn test_keypad_and_printable_classification() {
        assert!(Keysym::from_name("KP_5").unwrap().is_keypad());
        assert!(Keysym::KP_EQUAL.is_keypad());
        assert!(!Keysym::F1.is_keypad());

        assert!(Keysym(0x41).is_ascii_printable());
        assert!(Keysym(9).is_ascii_printable());
        assert!(!Keysym(11).is_ascii_printable());
        assert!(!Keysym(0x7f).is_ascii_printable());
        assert!(!Keysym::RETURN.is_ascii_printable());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(alias_target("enter"), Some("Return"));
        assert_eq!(alias_target("PageUp"), Some("Page_Up"));
        assert_eq!(alias_target("Return"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Keysym::SHIFT_L.to_string(), "Shift_L");
        assert_eq!(Keysym(0x61).to_string(), "a");
        assert_eq!(Keysym(0x1234).to_string(), "0x1234");
    }
}
