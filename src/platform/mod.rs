//! Platform backends and the traits they implement.
//!
//! Every backend provides three things: a [`KeyboardLayout`] describing which
//! keycodes produce which keysyms, a [`PlatformInput`] that injects synthetic
//! events, and an [`EventSource`] that delivers captured raw events. The
//! native backend is chosen at build time; [`loopback`] is always available.

use crate::error::Result;
use crate::event::{Button, KeyCode, RawEvent};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use std::ops::RangeInclusive;
use std::time::Duration;

pub mod loopback;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{NativeEventSource, NativeInput};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::{NativeEventSource, NativeInput};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{NativeEventSource, NativeInput};

// Ensure at least one platform is supported
#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
compile_error!("userinput only supports macOS, Windows, and Linux");

/// Read-only keyboard layout queries.
pub trait KeyboardLayout {
    /// The keycode that produces `keysym`, preferring unshifted positions.
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode>;

    /// The keysyms a keycode produces, in `[plain, shift, group2, group2+shift]`
    /// order. Empty for keycodes with no symbols.
    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym>;

    /// The range of valid keycodes.
    fn keycode_range(&self) -> RangeInclusive<KeyCode>;

    /// The keycodes bound to each modifier slot.
    fn modifier_keycodes(&self) -> Result<ModifierKeycodes>;

    /// How this platform reports lock keys.
    fn lock_style(&self) -> LockStyle;
}

/// Synthetic input injection.
pub trait PlatformInput: KeyboardLayout + Send + Sync {
    /// Press or release the key with the given keycode.
    fn inject_key_event(&self, code: KeyCode, pressed: bool) -> Result<()>;

    /// Press or release a mouse button at the current pointer position.
    fn inject_button_event(&self, button: Button, pressed: bool) -> Result<()>;

    /// Move the pointer to absolute screen coordinates.
    fn move_pointer(&self, x: f64, y: f64) -> Result<()>;

    /// Scroll by whole ticks. Positive `vertical` scrolls up, positive
    /// `horizontal` scrolls right.
    fn scroll(&self, vertical: i32, horizontal: i32) -> Result<()>;

    fn pointer_position(&self) -> Result<(f64, f64)>;

    fn screen_size(&self) -> Result<(f64, f64)>;
}

/// A source of captured raw input events.
pub trait EventSource: KeyboardLayout {
    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time, so callers can check
    /// their stop flag between polls.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawEvent>>;
}

/// What a native event source suppresses while it is capturing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Keep key and button events from reaching other applications.
    pub capture: bool,
    /// Keep pointer motion from reaching other applications.
    pub capture_move: bool,
}

/// Open the native injection backend.
pub fn open_input() -> Result<NativeInput> {
    NativeInput::open()
}

/// Open the native event source on the calling thread.
///
/// Windows hooks and macOS event taps are bound to the thread that installs
/// them, so this must run on the thread that will poll the source.
pub fn open_event_source(options: CaptureOptions) -> Result<NativeEventSource> {
    NativeEventSource::open(options)
}
