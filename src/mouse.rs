//! Mouse synthesizer.

use crate::error::Result;
use crate::event::Button;
use crate::platform::{NativeInput, PlatformInput};
use log::trace;

/// Moves the pointer and generates button and wheel events.
///
/// # Example
///
/// ```no_run
/// use userinput::{Button, Mouse};
///
/// let mouse = Mouse::new()?;
/// let (width, height) = mouse.screen_size()?;
/// mouse.click(width / 2.0, height / 2.0, Button::Left, 2)?;
/// mouse.scroll(-3, 0)?;
/// # Ok::<(), userinput::Error>(())
/// ```
pub struct Mouse<P = NativeInput> {
    platform: P,
}

impl Mouse<NativeInput> {
    /// Open the native backend.
    pub fn new() -> Result<Self> {
        Ok(Self::with_platform(NativeInput::open()?))
    }
}

impl<P: PlatformInput> Mouse<P> {
    pub fn with_platform(platform: P) -> Self {
        Self { platform }
    }

    /// Move to `(x, y)` and press `button` there.
    pub fn press(&self, x: f64, y: f64, button: Button) -> Result<()> {
        self.move_to(x, y)?;
        trace!("button {button:?} down at ({x}, {y})");
        self.platform.inject_button_event(button, true)
    }

    /// Move to `(x, y)` and release `button` there.
    pub fn release(&self, x: f64, y: f64, button: Button) -> Result<()> {
        self.move_to(x, y)?;
        trace!("button {button:?} up at ({x}, {y})");
        self.platform.inject_button_event(button, false)
    }

    /// Click `button` at `(x, y)` `n` times.
    pub fn click(&self, x: f64, y: f64, button: Button, n: usize) -> Result<()> {
        for _ in 0..n {
            self.press(x, y, button)?;
            self.release(x, y, button)?;
        }
        Ok(())
    }

    /// Scroll by whole ticks: positive `vertical` is up, positive
    /// `horizontal` is right. Zero on both axes does nothing.
    pub fn scroll(&self, vertical: i32, horizontal: i32) -> Result<()> {
        if vertical == 0 && horizontal == 0 {
            return Ok(());
        }
        trace!("scroll vertical {vertical} horizontal {horizontal}");
        self.platform.scroll(vertical, horizontal)
    }

    /// Move the pointer unless it is already at `(x, y)`.
    pub fn move_to(&self, x: f64, y: f64) -> Result<()> {
        if self.platform.pointer_position()? == (x, y) {
            return Ok(());
        }
        self.platform.move_pointer(x, y)
    }

    /// The current pointer position in screen pixels.
    pub fn position(&self) -> Result<(f64, f64)> {
        self.platform.pointer_position()
    }

    /// The screen size in pixels.
    pub fn screen_size(&self) -> Result<(f64, f64)> {
        self.platform.screen_size()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn into_platform(self) -> P {
        self.platform
    }
}
