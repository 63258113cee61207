//! macOS backend: CGEvent for injection, CGEventTap for capture.
//!
//! Keycodes are hardware virtual keycodes (`kVK_*`). Both injection and
//! capture need the Accessibility permission.

mod keycodes;
mod listen;
mod simulate;

pub use listen::MacEventSource as NativeEventSource;
pub use simulate::MacInput as NativeInput;
