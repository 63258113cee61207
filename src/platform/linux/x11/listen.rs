//! X11 input capture using the RECORD extension.
//!
//! Two connections are used: the control connection owns the record context
//! and any grabs, the data connection receives intercepted events. Replies
//! are pulled with `XRecordProcessReplies` from `poll_event`, so the record
//! callback always runs on the polling thread.

use super::keymap::X11Keymap;
use super::{Connection, FALSE};
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode, RawEvent, ScrollDirection};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use crate::platform::{CaptureOptions, EventSource, KeyboardLayout};
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::mem::size_of;
use std::ops::RangeInclusive;
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_uint, c_ulong, c_void};
use std::time::{Duration, Instant};
use x11::{xlib, xrecord};

/// Longest sleep between two reply checks.
const PUMP_INTERVAL: Duration = Duration::from_millis(5);

/// Leading fields of a core device event as sent on the wire.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct DeviceEvent {
    kind: u8,
    detail: u8,
    sequence: u16,
    time: u32,
    root: u32,
    event: u32,
    child: u32,
    root_x: i16,
    root_y: i16,
}

fn decode_button(detail: u8) -> Button {
    match detail {
        1 => Button::Left,
        2 => Button::Middle,
        3 => Button::Right,
        8 => Button::Button4,
        9 => Button::Button5,
        n => Button::Unknown(n),
    }
}

fn scroll_direction(detail: u8) -> Option<ScrollDirection> {
    match detail {
        4 => Some(ScrollDirection::Up),
        5 => Some(ScrollDirection::Down),
        6 => Some(ScrollDirection::Left),
        7 => Some(ScrollDirection::Right),
        _ => None,
    }
}

/// Convert an intercepted device event to a raw event.
fn convert_event(datum: &DeviceEvent) -> Option<RawEvent> {
    let kind = datum.kind as c_int;
    let code = datum.detail;
    let x = datum.root_x as f64;
    let y = datum.root_y as f64;

    match kind {
        t if t == xlib::KeyPress => Some(RawEvent::key_pressed(code as KeyCode)),
        t if t == xlib::KeyRelease => Some(RawEvent::key_released(code as KeyCode)),
        t if t == xlib::ButtonPress => match scroll_direction(code) {
            Some(direction) => Some(RawEvent::Scroll { direction, x, y }),
            None => Some(RawEvent::button_pressed(decode_button(code), x, y)),
        },
        t if t == xlib::ButtonRelease => match scroll_direction(code) {
            // Wheel "release" - ignored
            Some(_) => None,
            None => Some(RawEvent::button_released(decode_button(code), x, y)),
        },
        t if t == xlib::MotionNotify => Some(RawEvent::Motion { x, y }),
        _ => None,
    }
}

/// Record callback; `closure` is the source's event queue.
unsafe extern "C" fn record_callback(
    closure: *mut c_char,
    raw_data: *mut xrecord::XRecordInterceptData,
) {
    unsafe {
        let data = match raw_data.as_ref() {
            Some(d) => d,
            None => return,
        };
        let queue = closure as *mut VecDeque<RawEvent>;

        if data.category == xrecord::XRecordFromServer
            && !data.data.is_null()
            && (data.data_len as usize) * 4 >= size_of::<DeviceEvent>()
            && let Some(queue) = queue.as_mut()
        {
            let datum = std::ptr::read_unaligned(data.data as *const DeviceEvent);
            if let Some(event) = convert_event(&datum) {
                trace!("recorded {event:?}");
                queue.push_back(event);
            }
        }

        xrecord::XRecordFreeData(raw_data);
    }
}

/// Event source intercepting all core device events on the display.
pub struct X11EventSource {
    control: Connection,
    data: Connection,
    context: xrecord::XRecordContext,
    queue: *mut VecDeque<RawEvent>,
    keymap: X11Keymap,
    keyboard_grabbed: bool,
    pointer_grabbed: bool,
}

// The queue pointer is only dereferenced by the record callback, which runs
// inside `poll_event` on whichever thread owns the source.
unsafe impl Send for X11EventSource {}

impl X11EventSource {
    /// Connect to `$DISPLAY`, create a record context and start intercepting.
    pub fn open(options: CaptureOptions) -> Result<Self> {
        let control = Connection::open()?;
        let data = Connection::open()?;

        let extension = unsafe { xlib::XInitExtension(control.raw(), c"RECORD".as_ptr()) };
        if extension.is_null() {
            return Err(Error::NotSupported("XRecord extension not available".into()));
        }

        let keymap = X11Keymap::load(&control)?;
        let context = unsafe { create_context(&control)? };
        let queue = Box::into_raw(Box::new(VecDeque::new()));

        let enabled = unsafe {
            xrecord::XRecordEnableContextAsync(
                data.raw(),
                context,
                Some(record_callback),
                queue as *mut c_char,
            )
        };
        if enabled == 0 {
            unsafe {
                xrecord::XRecordFreeContext(control.raw(), context);
                drop(Box::from_raw(queue));
            }
            return Err(Error::Platform("Failed to enable XRecord context".into()));
        }

        let mut source = Self {
            control,
            data,
            context,
            queue,
            keymap,
            keyboard_grabbed: false,
            pointer_grabbed: false,
        };
        source.grab(options);
        debug!("XRecord context {} enabled", source.context);
        Ok(source)
    }

    /// Suppress delivery to other clients. Failing grabs are logged and the
    /// source keeps listening without them.
    fn grab(&mut self, options: CaptureOptions) {
        let display = self.control.raw();
        let root = self.control.root();

        if options.capture {
            let status = unsafe {
                xlib::XGrabKeyboard(
                    display,
                    root,
                    FALSE,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    xlib::CurrentTime,
                )
            };
            if status == xlib::GrabSuccess {
                self.keyboard_grabbed = true;
            } else {
                warn!("XGrabKeyboard failed with status {status}");
            }
        }

        let mut mask: c_long = 0;
        if options.capture {
            mask |= xlib::ButtonPressMask | xlib::ButtonReleaseMask;
        }
        if options.capture_move {
            mask |= xlib::PointerMotionMask;
        }
        if mask != 0 {
            let status = unsafe {
                xlib::XGrabPointer(
                    display,
                    root,
                    FALSE,
                    mask as c_uint,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    0,
                    0,
                    xlib::CurrentTime,
                )
            };
            if status == xlib::GrabSuccess {
                self.pointer_grabbed = true;
            } else {
                warn!("XGrabPointer failed with status {status}");
            }
        }

        self.control.sync();
    }

    fn pop(&mut self) -> Option<RawEvent> {
        unsafe { self.queue.as_mut() }.and_then(VecDeque::pop_front)
    }
}

/// Create a record context for every device event from all clients.
unsafe fn create_context(control: &Connection) -> Result<xrecord::XRecordContext> {
    unsafe {
        let mut range = xrecord::XRecordAllocRange();
        if range.is_null() {
            return Err(Error::Platform("XRecordAllocRange failed".into()));
        }
        (*range).device_events.first = xlib::KeyPress as c_uchar;
        (*range).device_events.last = xlib::MotionNotify as c_uchar;

        let mut clients: c_ulong = xrecord::XRecordAllClients;
        let context =
            xrecord::XRecordCreateContext(control.raw(), 0, &mut clients, 1, &mut range, 1);
        xlib::XFree(range as *mut c_void);

        if context == 0 {
            return Err(Error::Platform("Failed to create XRecord context".into()));
        }
        control.sync();
        Ok(context)
    }
}

impl KeyboardLayout for X11EventSource {
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

impl EventSource for X11EventSource {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pop() {
                return Ok(Some(event));
            }
            unsafe { xrecord::XRecordProcessReplies(self.data.raw()) };
            if let Some(event) = self.pop() {
                return Ok(Some(event));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(PUMP_INTERVAL.min(deadline - now));
        }
    }
}

impl Drop for X11EventSource {
    fn drop(&mut self) {
        let display = self.control.raw();
        unsafe {
            if self.keyboard_grabbed {
                xlib::XUngrabKeyboard(display, xlib::CurrentTime);
            }
            if self.pointer_grabbed {
                xlib::XUngrabPointer(display, xlib::CurrentTime);
            }
            xrecord::XRecordDisableContext(display, self.context);
            self.control.sync();
            // Drain the end-of-data reply so the callback never outlives the queue.
            xrecord::XRecordProcessReplies(self.data.raw());
            xrecord::XRecordFreeContext(display, self.context);
            self.control.sync();
            drop(Box::from_raw(self.queue));
        }
        debug!("XRecord context {} released", self.context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(kind: c_int, detail: u8) -> DeviceEvent {
        DeviceEvent {
            kind: kind as u8,
            detail,
            sequence: 0,
            time: 0,
            root: 0,
            event: 0,
            child: 0,
            root_x: 10,
            root_y: 20,
        }
    }

    #[test]
    fn test_device_event_layout() {
        assert_eq!(std::mem::offset_of!(DeviceEvent, root_x), 20);
        assert_eq!(std::mem::offset_of!(DeviceEvent, root_y), 22);
    }

    #[test]
    fn test_convert_keys() {
        assert_eq!(
            convert_event(&datum(xlib::KeyPress, 38)),
            Some(RawEvent::key_pressed(38))
        );
        assert_eq!(
            convert_event(&datum(xlib::KeyRelease, 38)),
            Some(RawEvent::key_released(38))
        );
    }

    #[test]
    fn test_convert_buttons_and_wheel() {
        assert_eq!(
            convert_event(&datum(xlib::ButtonPress, 3)),
            Some(RawEvent::button_pressed(Button::Right, 10.0, 20.0))
        );
        assert_eq!(
            convert_event(&datum(xlib::ButtonPress, 5)),
            Some(RawEvent::Scroll {
                direction: ScrollDirection::Down,
                x: 10.0,
                y: 20.0,
            })
        );
        assert_eq!(convert_event(&datum(xlib::ButtonRelease, 5)), None);
        assert_eq!(
            convert_event(&datum(xlib::MotionNotify, 0)),
            Some(RawEvent::Motion { x: 10.0, y: 20.0 })
        );
    }
}
