//! X11 event simulation using XTest.

use super::keymap::X11Keymap;
use super::{Connection, FALSE, TRUE};
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use crate::platform::{KeyboardLayout, PlatformInput};
use std::ops::RangeInclusive;
use std::os::raw::{c_int, c_uint};
use std::sync::{Mutex, MutexGuard};
use x11::{xlib, xtest};

/// Get X11 button code
fn button_to_code(button: Button) -> c_uint {
    match button {
        Button::Left => 1,
        Button::Middle => 2,
        Button::Right => 3,
        Button::Button4 => 8,
        Button::Button5 => 9,
        Button::Unknown(code) => code as c_uint,
    }
}

/// Wheel buttons for one axis: (positive direction, negative direction).
const VERTICAL_WHEEL: (c_uint, c_uint) = (4, 5);
const HORIZONTAL_WHEEL: (c_uint, c_uint) = (7, 6);

fn to_coordinate(value: f64) -> c_int {
    if value.is_finite() {
        value.clamp(c_int::MIN as f64, c_int::MAX as f64).round() as c_int
    } else {
        0
    }
}

/// XTest injection on a dedicated display connection.
pub struct X11Input {
    connection: Mutex<Connection>,
    keymap: X11Keymap,
}

impl X11Input {
    /// Connect to `$DISPLAY` and check for the XTEST extension.
    pub fn open() -> Result<Self> {
        let connection = Connection::open()?;
        let (mut event_base, mut error_base, mut major, mut minor) = (0, 0, 0, 0);
        let present = unsafe {
            xtest::XTestQueryExtension(
                connection.raw(),
                &mut event_base,
                &mut error_base,
                &mut major,
                &mut minor,
            )
        };
        if present == FALSE {
            return Err(Error::NotSupported("XTEST extension not available".into()));
        }
        let keymap = X11Keymap::load(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
            keymap,
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))
    }

    fn click_wheel(&self, connection: &Connection, button: c_uint, ticks: u32) -> Result<()> {
        for _ in 0..ticks {
            let pressed = unsafe { xtest::XTestFakeButtonEvent(connection.raw(), button, TRUE, 0) };
            let released =
                unsafe { xtest::XTestFakeButtonEvent(connection.raw(), button, FALSE, 0) };
            if pressed == 0 || released == 0 {
                return Err(Error::Platform("XTestFakeButtonEvent failed".into()));
            }
        }
        Ok(())
    }
}

impl KeyboardLayout for X11Input {
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
        self.keymap.keysym_to_keycode(keysym)
    }

    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
        self.keymap.keycode_to_keysyms(code)
    }

    fn keycode_range(&self) -> RangeInclusive<KeyCode> {
        self.keymap.keycode_range()
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
        self.keymap.modifier_keycodes()
    }

    fn lock_style(&self) -> LockStyle {
        self.keymap.lock_style()
    }
}

impl PlatformInput for X11Input {
    fn inject_key_event(&self, code: KeyCode, pressed: bool) -> Result<()> {
        let connection = self.connection()?;
        let state = if pressed { TRUE } else { FALSE };
        let result = unsafe { xtest::XTestFakeKeyEvent(connection.raw(), code, state, 0) };
        connection.sync();

        if result == 0 {
            Err(Error::Platform("XTestFakeKeyEvent failed".into()))
        } else {
            Ok(())
        }
    }

    fn inject_button_event(&self, button: Button, pressed: bool) -> Result<()> {
        let connection = self.connection()?;
        let state = if pressed { TRUE } else { FALSE };
        let result = unsafe {
            xtest::XTestFakeButtonEvent(connection.raw(), button_to_code(button), state, 0)
        };
        connection.sync();

        if result == 0 {
            Err(Error::Platform("XTestFakeButtonEvent failed".into()))
        } else {
            Ok(())
        }
    }

    fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        let connection = self.connection()?;
        let result = unsafe {
            xtest::XTestFakeMotionEvent(connection.raw(), -1, to_coordinate(x), to_coordinate(y), 0)
        };
        connection.sync();

        if result == 0 {
            Err(Error::Platform("XTestFakeMotionEvent failed".into()))
        } else {
            Ok(())
        }
    }

    /// X11 scrolls through button events (4=up, 5=down, 6=left, 7=right).
    fn scroll(&self, vertical: i32, horizontal: i32) -> Result<()> {
        let connection = self.connection()?;
        let vertical_button = if vertical > 0 {
            VERTICAL_WHEEL.0
        } else {
            VERTICAL_WHEEL.1
        };
        let horizontal_button = if horizontal > 0 {
            HORIZONTAL_WHEEL.0
        } else {
            HORIZONTAL_WHEEL.1
        };
        let result = self
            .click_wheel(&connection, vertical_button, vertical.unsigned_abs())
            .and_then(|_| {
                self.click_wheel(&connection, horizontal_button, horizontal.unsigned_abs())
            });
        connection.sync();
        result
    }

    fn pointer_position(&self) -> Result<(f64, f64)> {
        let connection = self.connection()?;
        let mut root_return = 0;
        let mut child_return = 0;
        let mut root_x: c_int = 0;
        let mut root_y: c_int = 0;
        let mut win_x: c_int = 0;
        let mut win_y: c_int = 0;
        let mut mask: c_uint = 0;

        let result = unsafe {
            xlib::XQueryPointer(
                connection.raw(),
                connection.root(),
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };

        if result == FALSE {
            Err(Error::Platform("XQueryPointer failed".into()))
        } else {
            Ok((root_x as f64, root_y as f64))
        }
    }

    fn screen_size(&self) -> Result<(f64, f64)> {
        let connection = self.connection()?;
        let display = connection.raw();
        let (width, height) = unsafe {
            let screen = xlib::XDefaultScreen(display);
            (
                xlib::XDisplayWidth(display, screen),
                xlib::XDisplayHeight(display, screen),
            )
        };
        Ok((width as f64, height as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_codes() {
        assert_eq!(button_to_code(Button::Left), 1);
        assert_eq!(button_to_code(Button::Middle), 2);
        assert_eq!(button_to_code(Button::Right), 3);
        assert_eq!(button_to_code(Button::Unknown(12)), 12);
    }

    #[test]
    fn test_coordinates_are_clamped() {
        assert_eq!(to_coordinate(12.6), 13);
        assert_eq!(to_coordinate(f64::NAN), 0);
        assert_eq!(to_coordinate(1e20), c_int::MAX);
    }
}
