//! macOS event simulation using CGEvent.

#![allow(unused_unsafe)]

use super::keycodes::{KVK_CAPS_LOCK, MacLayout, modifier_flag};
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use crate::platform::{KeyboardLayout, PlatformInput};
use objc2_core_foundation::{CFRetained, CGPoint};
use objc2_core_graphics::{
    CGDisplayBounds, CGEvent, CGEventField, CGEventFlags, CGEventSource, CGEventSourceStateID,
    CGEventTapLocation, CGEventType, CGMainDisplayID, CGMouseButton, CGScrollEventUnit,
};
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard};

/// Event types for a button transition, and while dragging with it.
fn button_event_types(button: Button) -> (CGEventType, CGEventType, CGEventType) {
    match button {
        Button::Left => (
            CGEventType::LeftMouseDown,
            CGEventType::LeftMouseUp,
            CGEventType::LeftMouseDragged,
        ),
        Button::Right => (
            CGEventType::RightMouseDown,
            CGEventType::RightMouseUp,
            CGEventType::RightMouseDragged,
        ),
        _ => (
            CGEventType::OtherMouseDown,
            CGEventType::OtherMouseUp,
            CGEventType::OtherMouseDragged,
        ),
    }
}

/// Convert our Button to CGMouseButton.
fn button_to_cg_button(button: Button) -> CGMouseButton {
    match button {
        Button::Left => CGMouseButton::Left,
        Button::Right => CGMouseButton::Right,
        _ => CGMouseButton::Center,
    }
}

fn event_source() -> Result<CFRetained<CGEventSource>> {
    unsafe { CGEventSource::new(CGEventSourceStateID::HIDSystemState) }
        .ok_or_else(|| Error::Platform("Failed to create event source".into()))
}

fn post(event: &CGEvent) {
    unsafe { CGEvent::post(CGEventTapLocation::HIDEventTap, Some(event)) };
}

/// CGEvent injection.
///
/// Modifier keys are posted as `FlagsChanged` events, and the accumulated
/// flags are attached to every key event that follows.
pub struct MacInput {
    layout: MacLayout,
    flags: Mutex<CGEventFlags>,
    held_button: Mutex<Option<Button>>,
}

impl MacInput {
    pub fn open() -> Result<Self> {
        Ok(Self {
            layout: MacLayout,
            flags: Mutex::new(CGEventFlags(0)),
            held_button: Mutex::new(None),
        })
    }

    fn flags(&self) -> Result<MutexGuard<'_, CGEventFlags>> {
        self.flags
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))
    }

    fn held_button(&self) -> Result<MutexGuard<'_, Option<Button>>> {
        self.held_button
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))
    }

    fn post_flags_changed(&self, vk: u16, flag: CGEventFlags, pressed: bool) -> Result<()> {
        let source = event_source()?;
        let event = unsafe { CGEvent::new(Some(&source)) }
            .ok_or_else(|| Error::Platform("Failed to create event".into()))?;

        let mut flags = self.flags()?;
        if vk == KVK_CAPS_LOCK {
            if pressed {
                flags.toggle(flag);
            }
        } else if pressed {
            flags.insert(flag);
        } else {
            flags.remove(flag);
        }

        unsafe {
            CGEvent::set_type(Some(&event), CGEventType::FlagsChanged);
            CGEvent::set_integer_value_field(
                Some(&event),
                CGEventField::KeyboardEventKeycode,
                vk as i64,
            );
            CGEvent::set_flags(Some(&event), *flags);
        }
        post(&event);
        Ok(())
    }
}

impl KeyboardLayout for MacInput {
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

impl PlatformInput for MacInput {
    fn inject_key_event(&self, code: KeyCode, pressed: bool) -> Result<()> {
        let vk = u16::try_from(code)
            .map_err(|_| Error::Platform(format!("keycode {code} is out of range")))?;

        if let Some(flag) = modifier_flag(vk) {
            return self.post_flags_changed(vk, flag, pressed);
        }

        let source = event_source()?;
        let event = unsafe { CGEvent::new_keyboard_event(Some(&source), vk, pressed) }
            .ok_or_else(|| Error::Platform("Failed to create keyboard event".into()))?;
        let flags = self.flags()?;
        unsafe { CGEvent::set_flags(Some(&event), *flags) };
        post(&event);
        Ok(())
    }

    fn inject_button_event(&self, button: Button, pressed: bool) -> Result<()> {
        let (x, y) = self.pointer_position()?;
        let (down, up, _) = button_event_types(button);
        let event_type = if pressed { down } else { up };

        let source = event_source()?;
        let event = unsafe {
            CGEvent::new_mouse_event(
                Some(&source),
                event_type,
                CGPoint { x, y },
                button_to_cg_button(button),
            )
        }
        .ok_or_else(|| Error::Platform("Failed to create mouse event".into()))?;

        // Set button number for other mouse buttons
        if let Button::Button4 | Button::Button5 | Button::Middle | Button::Unknown(_) = button {
            unsafe {
                CGEvent::set_integer_value_field(
                    Some(&event),
                    CGEventField::MouseEventButtonNumber,
                    button.number().saturating_sub(1) as i64,
                );
            }
        }

        post(&event);
        *self.held_button()? = if pressed { Some(button) } else { None };
        Ok(())
    }

    /// Moves while a button is held are posted as drags.
    fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        let held = *self.held_button()?;
        let (event_type, cg_button) = match held {
            Some(button) => (button_event_types(button).2, button_to_cg_button(button)),
            None => (CGEventType::MouseMoved, CGMouseButton::Left),
        };

        let source = event_source()?;
        let event = unsafe {
            CGEvent::new_mouse_event(Some(&source), event_type, CGPoint { x, y }, cg_button)
        }
        .ok_or_else(|| Error::Platform("Failed to create mouse event".into()))?;

        post(&event);
        Ok(())
    }

    /// One line-unit event per tick. Positive wheel 2 values scroll left.
    fn scroll(&self, vertical: i32, horizontal: i32) -> Result<()> {
        let source = event_source()?;
        let ticks = [
            (vertical.signum(), 0, vertical.unsigned_abs()),
            (0, -horizontal.signum(), horizontal.unsigned_abs()),
        ];
        for (wheel1, wheel2, count) in ticks {
            for _ in 0..count {
                let event = unsafe {
                    CGEvent::new_scroll_wheel_event2(
                        Some(&source),
                        CGScrollEventUnit::Line,
                        2, // wheel_count
                        wheel1,
                        wheel2,
                        0,
                    )
                }
                .ok_or_else(|| Error::Platform("Failed to create scroll event".into()))?;
                post(&event);
            }
        }
        Ok(())
    }

    fn pointer_position(&self) -> Result<(f64, f64)> {
        let source = event_source()?;
        let event = unsafe { CGEvent::new(Some(&source)) }
            .ok_or_else(|| Error::Platform("Failed to create event".into()))?;
        let point = unsafe { CGEvent::location(Some(&event)) };
        Ok((point.x, point.y))
    }

    fn screen_size(&self) -> Result<(f64, f64)> {
        let bounds = unsafe { CGDisplayBounds(CGMainDisplayID()) };
        Ok((bounds.size.width, bounds.size.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_event_types() {
        assert_eq!(
            button_event_types(Button::Left).0,
            CGEventType::LeftMouseDown
        );
        assert_eq!(
            button_event_types(Button::Middle).2,
            CGEventType::OtherMouseDragged
        );
    }
}
