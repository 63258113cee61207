//! # userinput
//!
//! Cross-platform keyboard and mouse input synthesis and listening.
//!
//! ## Features
//!
//! - Cross-platform support (macOS, Windows, Linux/X11)
//! - Layout-aware key resolution: characters and key names are mapped to
//!   keycodes through the active keyboard layout, never a hardcoded table
//! - Typing with minimal Shift toggling
//! - Listener that decodes keycodes back to characters using the live
//!   modifier state (Shift, Caps Lock, Num Lock, Mode_switch)
//! - In-memory loopback backend for tests and headless use
//!
//! ## Quick Start
//!
//! ### Synthesizing Input
//!
//! ```no_run
//! use userinput::{Button, Keyboard, Mouse};
//! use std::time::Duration;
//!
//! let keyboard = Keyboard::new()?;
//! keyboard.type_string("Hello, World!", Duration::from_millis(5))?;
//! keyboard.press_keys(["Control_L", "a"])?;
//!
//! let mouse = Mouse::new()?;
//! mouse.click(100.0, 100.0, Button::Left, 1)?;
//! # Ok::<(), userinput::Error>(())
//! ```
//!
//! ### Listening for Events
//!
//! ```no_run
//! use userinput::{InputEvent, listen};
//!
//! // Runs until Escape is pressed.
//! listen(|event: &InputEvent| {
//!     if let InputEvent::Key(key) = event {
//!         if key.pressed {
//!             println!("{} ({:?})", key.symbol, key.modifiers);
//!         }
//!     }
//! })?;
//! # Ok::<(), userinput::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Each backend implements the [`platform::KeyboardLayout`],
//! [`platform::PlatformInput`] and [`platform::EventSource`] traits. A
//! [`KeyTable`] is built from the layout once per [`Keyboard`] or
//! [`Listener`]; the listener's [`Decoder`] pairs it with a
//! [`ModifierTracker`] fed only by observed key events.

pub mod channel;
pub mod decode;
pub mod error;
pub mod event;
pub mod keyboard;
pub mod keymap;
pub mod keysym;
pub mod layout;
pub mod listener;
pub mod modifier;
pub mod mouse;
pub mod platform;

// Re-exports
pub use decode::Decoder;
pub use error::{Error, Result};
pub use event::{Button, InputEvent, KeyCode, KeyEvent, KeySymbol, RawEvent, ScrollDirection};
pub use keyboard::Keyboard;
pub use keymap::{KeyTable, LockMeaning};
pub use keysym::Keysym;
pub use layout::UsLayout;
pub use listener::{EscapePredicate, EventHandler, Listener, ListenerConfig, StopHandle, listen};
pub use modifier::{LockStyle, Modifier, ModifierKeycodes, ModifierSet, ModifierTracker};
pub use mouse::Mouse;
pub use platform::{NativeEventSource, NativeInput};
