//! Windows input capture using low-level hooks.
//!
//! Hook procedures carry no user data, so captured events go through a
//! process-wide queue and only one source can exist at a time. Hooks are
//! serviced while the installing thread pumps messages in `poll_event`.

use super::keycodes::WindowsLayout;
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode, RawEvent, ScrollDirection};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use crate::platform::{CaptureOptions, EventSource, KeyboardLayout};
use log::{debug, warn};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT,
    PM_REMOVE, PeekMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx,
    WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP,
    WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_RBUTTONDOWN,
    WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

/// Longest sleep between two message pumps.
const PUMP_INTERVAL: Duration = Duration::from_millis(5);

/// Set while a source exists.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Events captured by the hook procedures.
static QUEUE: Mutex<VecDeque<RawEvent>> = Mutex::new(VecDeque::new());

/// Suppress key and button events.
static CAPTURE: AtomicBool = AtomicBool::new(false);

/// Suppress pointer motion.
static CAPTURE_MOVE: AtomicBool = AtomicBool::new(false);

/// Get point from MSLLHOOKSTRUCT
unsafe fn get_mouse_point(lparam: LPARAM) -> (f64, f64) {
    let mouse = unsafe { *(lparam.0 as *const MSLLHOOKSTRUCT) };
    (mouse.pt.x as f64, mouse.pt.y as f64)
}

/// High word of `mouseData`: wheel delta or X button number.
unsafe fn get_mouse_data(lparam: LPARAM) -> i16 {
    let mouse = unsafe { *(lparam.0 as *const MSLLHOOKSTRUCT) };
    ((mouse.mouseData >> 16) & 0xFFFF) as i16
}

fn xbutton(number: i16) -> Button {
    match number {
        1 => Button::Button4,
        2 => Button::Button5,
        n => Button::Unknown(n as u8),
    }
}

/// Convert a keyboard hook message.
unsafe fn convert_key(wparam: WPARAM, lparam: LPARAM) -> Option<RawEvent> {
    let kb = unsafe { *(lparam.0 as *const KBDLLHOOKSTRUCT) };
    let code = kb.vkCode as KeyCode;
    match wparam.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => Some(RawEvent::key_pressed(code)),
        WM_KEYUP | WM_SYSKEYUP => Some(RawEvent::key_released(code)),
        _ => None,
    }
}

/// Convert a mouse hook message.
unsafe fn convert_mouse(wparam: WPARAM, lparam: LPARAM) -> Option<RawEvent> {
    let (x, y) = unsafe { get_mouse_point(lparam) };
    let extra_button = || xbutton(unsafe { get_mouse_data(lparam) });
    let event = match wparam.0 as u32 {
        WM_LBUTTONDOWN => RawEvent::button_pressed(Button::Left, x, y),
        WM_LBUTTONUP => RawEvent::button_released(Button::Left, x, y),
        WM_RBUTTONDOWN => RawEvent::button_pressed(Button::Right, x, y),
        WM_RBUTTONUP => RawEvent::button_released(Button::Right, x, y),
        WM_MBUTTONDOWN => RawEvent::button_pressed(Button::Middle, x, y),
        WM_MBUTTONUP => RawEvent::button_released(Button::Middle, x, y),
        WM_XBUTTONDOWN => RawEvent::button_pressed(extra_button(), x, y),
        WM_XBUTTONUP => RawEvent::button_released(extra_button(), x, y),
        WM_MOUSEMOVE => RawEvent::Motion { x, y },
        WM_MOUSEWHEEL => {
            let direction = if unsafe { get_mouse_data(lparam) } > 0 {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };
            RawEvent::Scroll { direction, x, y }
        }
        WM_MOUSEHWHEEL => {
            let direction = if unsafe { get_mouse_data(lparam) } > 0 {
                ScrollDirection::Right
            } else {
                ScrollDirection::Left
            };
            RawEvent::Scroll { direction, x, y }
        }
        _ => return None,
    };
    Some(event)
}

/// Queue an event and report whether it should be swallowed.
fn record(event: RawEvent) -> bool {
    let suppress = match event {
        RawEvent::Motion { .. } => CAPTURE_MOVE.load(Ordering::SeqCst),
        _ => CAPTURE.load(Ordering::SeqCst),
    };
    if let Ok(mut queue) = QUEUE.lock() {
        queue.push_back(event);
    }
    suppress
}

/// Keyboard hook callback
unsafe extern "system" fn keyboard_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32
        && let Some(event) = unsafe { convert_key(wparam, lparam) }
        && record(event)
    {
        return LRESULT(1);
    }
    unsafe { CallNextHookEx(None, code, wparam, lparam) }
}

/// Mouse hook callback
unsafe extern "system" fn mouse_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32
        && let Some(event) = unsafe { convert_mouse(wparam, lparam) }
        && record(event)
    {
        return LRESULT(1);
    }
    unsafe { CallNextHookEx(None, code, wparam, lparam) }
}

/// Low-level keyboard and mouse hooks installed on the opening thread.
pub struct WindowsEventSource {
    keyboard_hook: HHOOK,
    mouse_hook: HHOOK,
    layout: WindowsLayout,
}

impl WindowsEventSource {
    pub fn open(options: CaptureOptions) -> Result<Self> {
        if ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        CAPTURE.store(options.capture, Ordering::SeqCst);
        CAPTURE_MOVE.store(options.capture_move, Ordering::SeqCst);
        if let Ok(mut queue) = QUEUE.lock() {
            queue.clear();
        }

        let keyboard_hook =
            match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_callback), None, 0) } {
                Ok(hook) => hook,
                Err(e) => {
                    ACTIVE.store(false, Ordering::SeqCst);
                    return Err(Error::Platform(format!("Failed to set keyboard hook: {e}")));
                }
            };

        let mouse_hook =
            match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_callback), None, 0) } {
                Ok(hook) => hook,
                Err(e) => {
                    unsafe {
                        let _ = UnhookWindowsHookEx(keyboard_hook);
                    }
                    ACTIVE.store(false, Ordering::SeqCst);
                    return Err(Error::Platform(format!("Failed to set mouse hook: {e}")));
                }
            };

        debug!("low-level hooks installed");
        Ok(Self {
            keyboard_hook,
            mouse_hook,
            layout: WindowsLayout::load(),
        })
    }

    fn pop(&self) -> Result<Option<RawEvent>> {
        let mut queue = QUEUE
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))?;
        Ok(queue.pop_front())
    }

    fn pump(&self) {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

impl KeyboardLayout for WindowsEventSource {
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<KeyCode> {
        self.layout.keysym_to_keycode(keysym)
    }

    fn keycode_to_keysyms(&self, code: KeyCode) -> Vec<Keysym> {
        self.layout.keycode_to_keysyms(code)
    }

    fn keycode_range(&self) -> RangeInclusive<KeyCode> {
        self.layout.keycode_range()
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes> {
        self.layout.modifier_keycodes()
    }

    fn lock_style(&self) -> LockStyle {
        self.layout.lock_style()
    }
}

impl EventSource for WindowsEventSource {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pop()? {
                return Ok(Some(event));
            }
            self.pump();
            if let Some(event) = self.pop()? {
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

impl Drop for WindowsEventSource {
    fn drop(&mut self) {
        unsafe {
            if UnhookWindowsHookEx(self.keyboard_hook).is_err() {
                warn!("failed to remove keyboard hook");
            }
            if UnhookWindowsHookEx(self.mouse_hook).is_err() {
                warn!("failed to remove mouse hook");
            }
        }
        if let Ok(mut queue) = QUEUE.lock() {
            queue.clear();
        }
        CAPTURE.store(false, Ordering::SeqCst);
        CAPTURE_MOVE.store(false, Ordering::SeqCst);
        ACTIVE.store(false, Ordering::SeqCst);
        debug!("low-level hooks removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xbutton_numbers() {
        assert_eq!(xbutton(1), Button::Button4);
        assert_eq!(xbutton(2), Button::Button5);
        assert_eq!(xbutton(7), Button::Unknown(7));
    }
}
