//! Linux platform implementation.
//!
//! The `x11` feature (default) selects the X11 backend: XTest for injection
//! and the RECORD extension for capture. Without it every native operation
//! fails with [`Error::NotSupported`](crate::Error::NotSupported); the
//! loopback backend still works.

#[cfg(feature = "x11")]
mod x11;

#[cfg(feature = "x11")]
pub use x11::{X11EventSource as NativeEventSource, X11Input as NativeInput};

#[cfg(not(feature = "x11"))]
pub use stub::{StubEventSource as NativeEventSource, StubInput as NativeInput};

// If the X11 feature is not enabled, provide stub implementations
#[cfg(not(feature = "x11"))]
mod stub {
    use crate::error::{Error, Result};
    use crate::event::{Button, KeyCode, RawEvent};
    use crate::keysym::Keysym;
    use crate::modifier::{LockStyle, ModifierKeycodes};
    use crate::platform::{CaptureOptions, EventSource, KeyboardLayout, PlatformInput};
    use std::ops::RangeInclusive;
    use std::time::Duration;

    fn unsupported() -> Error {
        Error::NotSupported("No Linux backend enabled. Enable the 'x11' feature.".into())
    }

    macro_rules! empty_layout {
        ($ty:ty) => {
            impl KeyboardLayout for $ty {
                fn keysym_to_keycode(&self, _keysym: Keysym) -> Option<KeyCode> {
                    None
                }

                fn keycode_to_keysyms(&self, _code: KeyCode) -> Vec<Keysym> {
                    Vec::new()
                }

                fn keycode_range(&self) -> RangeInclusive<KeyCode> {
                    8..=255
                }

                fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
                    Err(unsupported())
                }

                fn lock_style(&self) -> LockStyle {
                    LockStyle::UnlockOnRelease
                }
            }
        };
    }

    /// Placeholder that cannot be opened.
    pub struct StubInput(());

    impl StubInput {
        pub fn open() -> Result<Self> {
            Err(unsupported())
        }
    }

    empty_layout!(StubInput);

    impl PlatformInput for StubInput {
        fn inject_key_event(&self, _code: KeyCode, _pressed: bool) -> Result<()> {
            Err(unsupported())
        }

        fn inject_button_event(&self, _button: Button, _pressed: bool) -> Result<()> {
            Err(unsupported())
        }

        fn move_pointer(&self, _x: f64, _y: f64) -> Result<()> {
            Err(unsupported())
        }

        fn scroll(&self, _vertical: i32, _horizontal: i32) -> Result<()> {
            Err(unsupported())
        }

        fn pointer_position(&self) -> Result<(f64, f64)> {
            Err(unsupported())
        }

        fn screen_size(&self) -> Result<(f64, f64)> {
            Err(unsupported())
        }
    }

    /// Placeholder that cannot be opened.
    pub struct StubEventSource(());

    impl StubEventSource {
        pub fn open(_options: CaptureOptions) -> Result<Self> {
            Err(unsupported())
        }
    }

    empty_layout!(StubEventSource);

    impl EventSource for StubEventSource {
        fn poll_event(&mut self, _timeout: Duration) -> Result<Option<RawEvent>> {
            Err(unsupported())
        }
    }
}
