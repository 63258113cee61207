//! macOS input capture using CGEventTap.
//!
//! The tap is attached to the run loop of the opening thread; `poll_event`
//! runs that loop in short slices, so the tap callback always executes on
//! the polling thread.

#![allow(unsafe_op_in_unsafe_fn)]

use super::keycodes::{KVK_CAPS_LOCK, MacLayout, modifier_flag};
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode, RawEvent, ScrollDirection};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use crate::platform::{CaptureOptions, EventSource, KeyboardLayout};
use core::ptr::NonNull;
use log::{debug, warn};
use objc2_core_foundation::{
    CFMachPort, CFRetained, CFRunLoop, CFRunLoopSource, kCFRunLoopCommonModes,
    kCFRunLoopDefaultMode,
};
use objc2_core_graphics::{
    CGEvent, CGEventField, CGEventTapCallBack, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, kCGEventMaskForAllEvents,
};
use std::collections::VecDeque;
use std::ffi::c_void;
use std::ops::RangeInclusive;
use std::ptr::null_mut;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[link(name = "Cocoa", kind = "framework")]
unsafe extern "C" {}

/// Set while a tap session exists in this process.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Claim on the process-wide tap session, released on drop.
struct Session;

impl Session {
    fn claim() -> Result<Self> {
        ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Session)
            .map_err(|_| Error::AlreadyRunning)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// State shared with the tap callback through its user-info pointer.
struct TapState {
    queue: VecDeque<RawEvent>,
    /// Modifier keycodes currently down, to tell presses from releases.
    held_modifiers: Vec<u16>,
    capture: bool,
    capture_move: bool,
    tap: *const CFMachPort,
}

/// Convert button number to Button enum
fn number_to_button(button: i64) -> Button {
    match button {
        0 => Button::Left,
        1 => Button::Right,
        2 => Button::Middle,
        3 => Button::Button4,
        4 => Button::Button5,
        n => Button::Unknown(n as u8),
    }
}

fn scroll_direction(vertical: i64, horizontal: i64) -> ScrollDirection {
    if vertical.abs() >= horizontal.abs() {
        if vertical > 0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        }
    } else if horizontal > 0 {
        ScrollDirection::Left
    } else {
        ScrollDirection::Right
    }
}

/// Turn a `FlagsChanged` event into key transitions.
///
/// Caps Lock reports one event per toggle, so each is a full press.
fn flags_changed(state: &mut TapState, vk: u16, flag_set: bool, out: &mut Vec<RawEvent>) {
    let code = vk as KeyCode;
    if vk == KVK_CAPS_LOCK {
        out.push(RawEvent::key_pressed(code));
        out.push(RawEvent::key_released(code));
        return;
    }
    let held = state.held_modifiers.iter().position(|held| *held == vk);
    match held {
        Some(index) => {
            state.held_modifiers.swap_remove(index);
            out.push(RawEvent::key_released(code));
        }
        None if flag_set => {
            state.held_modifiers.push(vk);
            out.push(RawEvent::key_pressed(code));
        }
        None => {}
    }
}

/// Convert a CGEvent to raw events.
unsafe fn convert_event(
    state: &mut TapState,
    event_type: CGEventType,
    cg_event: &CGEvent,
) -> Vec<RawEvent> {
    let mut events = Vec::new();
    let point = CGEvent::location(Some(cg_event));
    let (x, y) = (point.x, point.y);
    let keycode = CGEvent::integer_value_field(Some(cg_event), CGEventField::KeyboardEventKeycode);

    match event_type {
        CGEventType::KeyDown | CGEventType::KeyUp => {
            let code = keycode as KeyCode;
            events.push(if event_type == CGEventType::KeyDown {
                RawEvent::key_pressed(code)
            } else {
                RawEvent::key_released(code)
            });
        }

        CGEventType::FlagsChanged => {
            let vk = keycode as u16;
            if let Some(flag) = modifier_flag(vk) {
                let flag_set = CGEvent::flags(Some(cg_event)).contains(flag);
                flags_changed(state, vk, flag_set, &mut events);
            }
        }

        CGEventType::LeftMouseDown => events.push(RawEvent::button_pressed(Button::Left, x, y)),
        CGEventType::LeftMouseUp => events.push(RawEvent::button_released(Button::Left, x, y)),
        CGEventType::RightMouseDown => events.push(RawEvent::button_pressed(Button::Right, x, y)),
        CGEventType::RightMouseUp => events.push(RawEvent::button_released(Button::Right, x, y)),

        CGEventType::OtherMouseDown | CGEventType::OtherMouseUp => {
            let number =
                CGEvent::integer_value_field(Some(cg_event), CGEventField::MouseEventButtonNumber);
            let button = number_to_button(number);
            events.push(if event_type == CGEventType::OtherMouseDown {
                RawEvent::button_pressed(button, x, y)
            } else {
                RawEvent::button_released(button, x, y)
            });
        }

        CGEventType::MouseMoved
        | CGEventType::LeftMouseDragged
        | CGEventType::RightMouseDragged
        | CGEventType::OtherMouseDragged => events.push(RawEvent::Motion { x, y }),

        CGEventType::ScrollWheel => {
            let vertical = CGEvent::integer_value_field(
                Some(cg_event),
                CGEventField::ScrollWheelEventDeltaAxis1,
            );
            let horizontal = CGEvent::integer_value_field(
                Some(cg_event),
                CGEventField::ScrollWheelEventDeltaAxis2,
            );
            if vertical != 0 || horizontal != 0 {
                events.push(RawEvent::Scroll {
                    direction: scroll_direction(vertical, horizontal),
                    x,
                    y,
                });
            }
        }

        _ => {}
    }
    events
}

/// The CGEventTap callback
unsafe extern "C-unwind" fn event_callback(
    _proxy: CGEventTapProxy,
    event_type: CGEventType,
    cg_event: NonNull<CGEvent>,
    user_info: *mut c_void,
) -> *mut CGEvent {
    let Some(state) = (user_info as *mut TapState).as_mut() else {
        return cg_event.as_ptr();
    };

    // macOS disables the tap if a callback takes too long; turn it back on.
    if event_type == CGEventType::TapDisabledByTimeout
        || event_type == CGEventType::TapDisabledByUserInput
    {
        warn!("Event tap was disabled (timeout or user input), re-enabling...");
        if !state.tap.is_null() {
            CGEvent::tap_enable(&*state.tap, true);
        }
        return cg_event.as_ptr();
    }

    let events = convert_event(state, event_type, cg_event.as_ref());
    let suppress = events.iter().any(|event| match event {
        RawEvent::Motion { .. } => state.capture_move,
        _ => state.capture,
    });
    state.queue.extend(events);

    if suppress {
        null_mut()
    } else {
        cg_event.as_ptr()
    }
}

/// Event tap on the session's HID event stream.
pub struct MacEventSource {
    tap: CFRetained<CFMachPort>,
    run_loop_source: CFRetained<CFRunLoopSource>,
    run_loop: CFRetained<CFRunLoop>,
    state: *mut TapState,
    layout: MacLayout,
    _session: Session,
}

impl MacEventSource {
    /// Install the tap on the calling thread's run loop.
    ///
    /// Only one source may exist per process; a second open fails with
    /// [`Error::AlreadyRunning`].
    pub fn open(options: CaptureOptions) -> Result<Self> {
        let session = Session::claim()?;
        let state = Box::into_raw(Box::new(TapState {
            queue: VecDeque::new(),
            held_modifiers: Vec::new(),
            capture: options.capture,
            capture_move: options.capture_move,
            tap: std::ptr::null(),
        }));

        let result = unsafe { Self::install(state, options, session) };
        if result.is_err() {
            drop(unsafe { Box::from_raw(state) });
        }
        result
    }

    unsafe fn install(
        state: *mut TapState,
        options: CaptureOptions,
        session: Session,
    ) -> Result<Self> {
        // Only an active tap may drop events.
        let tap_options = if options.capture || options.capture_move {
            CGEventTapOptions::Default
        } else {
            CGEventTapOptions::ListenOnly
        };

        let callback: CGEventTapCallBack = Some(event_callback);
        let tap = CGEvent::tap_create(
            CGEventTapLocation::HIDEventTap,
            CGEventTapPlacement::HeadInsertEventTap,
            tap_options,
            kCGEventMaskForAllEvents.into(),
            callback,
            state as *mut c_void,
        )
        .ok_or_else(|| {
            Error::PermissionDenied(
                "Failed to create event tap. Make sure Accessibility permissions are granted."
                    .into(),
            )
        })?;
        (*state).tap = &*tap as *const CFMachPort;

        let run_loop_source = CFMachPort::new_run_loop_source(None, Some(&tap), 0)
            .ok_or_else(|| Error::Platform("Failed to create run loop source".into()))?;

        let run_loop = CFRunLoop::current()
            .ok_or_else(|| Error::Platform("Failed to get current run loop".into()))?;

        run_loop.add_source(Some(&run_loop_source), kCFRunLoopCommonModes);
        CGEvent::tap_enable(&tap, true);
        debug!("event tap enabled ({tap_options:?})");

        Ok(Self {
            tap,
            run_loop_source,
            run_loop,
            state,
            layout: MacLayout,
            _session: session,
        })
    }

    fn pop(&mut self) -> Option<RawEvent> {
        unsafe { self.state.as_mut() }.and_then(|state| state.queue.pop_front())
    }
}

impl KeyboardLayout for MacEventSource {
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

impl EventSource for MacEventSource {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawEvent>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pop() {
                return Ok(Some(event));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let slice = (deadline - now).as_secs_f64();
            unsafe { CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, slice, true) };
        }
    }
}

impl Drop for MacEventSource {
    fn drop(&mut self) {
        unsafe {
            CGEvent::tap_enable(&self.tap, false);
            self.run_loop
                .remove_source(Some(&self.run_loop_source), kCFRunLoopCommonModes);
            self.tap.invalidate();
            drop(Box::from_raw(self.state));
        }
        debug!("event tap removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::macos::keycodes::KVK_SHIFT;

    fn state() -> TapState {
        TapState {
            queue: VecDeque::new(),
            held_modifiers: Vec::new(),
            capture: false,
            capture_move: false,
            tap: std::ptr::null(),
        }
    }

    #[test]
    fn test_one_session_per_process() {
        let first = Session::claim().unwrap();
        assert!(matches!(Session::claim(), Err(Error::AlreadyRunning)));
        drop(first);
        let again = Session::claim();
        assert!(again.is_ok());
    }

    #[test]
    fn test_shift_press_and_release() {
        let mut state = state();
        let mut out = Vec::new();
        flags_changed(&mut state, KVK_SHIFT, true, &mut out);
        flags_changed(&mut state, KVK_SHIFT, false, &mut out);
        assert_eq!(
            out,
            vec![
                RawEvent::key_pressed(KVK_SHIFT as KeyCode),
                RawEvent::key_released(KVK_SHIFT as KeyCode)
            ]
        );
    }

    #[test]
    fn test_caps_lock_is_always_a_press() {
        let mut state = state();
        let mut out = Vec::new();
        flags_changed(&mut state, KVK_CAPS_LOCK, false, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], RawEvent::key_pressed(KVK_CAPS_LOCK as KeyCode));
    }

    #[test]
    fn test_scroll_direction() {
        assert_eq!(scroll_direction(1, 0), ScrollDirection::Up);
        assert_eq!(scroll_direction(-2, 1), ScrollDirection::Down);
        assert_eq!(scroll_direction(0, 1), ScrollDirection::Left);
        assert_eq!(scroll_direction(0, -1), ScrollDirection::Right);
    }
}
