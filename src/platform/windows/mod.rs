//! Windows backend: SendInput for injection, low-level hooks for capture.
//!
//! Keycodes are virtual-key codes.

mod keycodes;
mod listen;
mod simulate;

pub use listen::WindowsEventSource as NativeEventSource;
pub use simulate::WindowsInput as NativeInput;
