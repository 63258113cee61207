//! X11 backend: XTest for injection, RECORD for capture.

mod keymap;
mod listen;
mod simulate;

pub use listen::X11EventSource;
pub use simulate::X11Input;

use crate::error::{Error, Result};
use std::os::raw::c_int;
use std::ptr::null;
use x11::xlib;

pub(super) const TRUE: c_int = 1;
pub(super) const FALSE: c_int = 0;

/// An owned Xlib display connection.
///
/// Xlib connections are not thread-safe; owners either keep the connection
/// on one thread or put it behind a mutex.
pub(super) struct Connection {
    display: *mut xlib::Display,
}

// The raw pointer is only used by whoever owns the connection.
unsafe impl Send for Connection {}

impl Connection {
    /// Open the display named by `$DISPLAY`.
    pub fn open() -> Result<Self> {
        let display = unsafe { xlib::XOpenDisplay(null()) };
        if display.is_null() {
            Err(Error::Platform("Failed to open X display".into()))
        } else {
            Ok(Self { display })
        }
    }

    pub fn raw(&self) -> *mut xlib::Display {
        self.display
    }

    pub fn root(&self) -> xlib::Window {
        unsafe { xlib::XRootWindow(self.display, xlib::XDefaultScreen(self.display)) }
    }

    /// Flush and wait until the server has processed every request.
    pub fn sync(&self) {
        unsafe {
            xlib::XFlush(self.display);
            xlib::XSync(self.display, FALSE);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe { xlib::XCloseDisplay(self.display) };
    }
}
