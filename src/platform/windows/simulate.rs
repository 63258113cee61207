//! Windows event simulation using SendInput.

use super::keycodes::{WindowsLayout, is_extended_key};
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode};
use crate::keysym::Keysym;
use crate::modifier::{LockStyle, ModifierKeycodes};
use crate::platform::{KeyboardLayout, PlatformInput};
use std::mem::size_of;
use std::ops::RangeInclusive;
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MAPVK_VK_TO_VSC, MOUSE_EVENT_FLAGS,
    MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK, MOUSEEVENTF_WHEEL, MOUSEEVENTF_XDOWN,
    MOUSEEVENTF_XUP, MOUSEINPUT, MapVirtualKeyW, SendInput, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SM_CXSCREEN, SM_CXVIRTUALSCREEN, SM_CYSCREEN,
    SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};

const WHEEL_DELTA: i32 = 120;

/// Send a mouse event
fn sim_mouse_event(flags: MOUSE_EVENT_FLAGS, data: u32, dx: i32, dy: i32) -> Result<()> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    let inputs = [input];
    let result = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };

    if result != 1 {
        Err(Error::Platform("SendInput failed for mouse event".into()))
    } else {
        Ok(())
    }
}

/// Send a keyboard event
fn sim_keyboard_event(vk: u16, pressed: bool) -> Result<()> {
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if !pressed {
        flags |= KEYEVENTF_KEYUP;
    }
    if is_extended_key(vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    let scan = unsafe { MapVirtualKeyW(vk as u32, MAPVK_VK_TO_VSC) } as u16;

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    let inputs = [input];
    let result = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };

    if result != 1 {
        Err(Error::Platform("SendInput failed for keyboard event".into()))
    } else {
        Ok(())
    }
}

/// Flags and X-button data for a button transition.
fn button_flags(button: Button, pressed: bool) -> (MOUSE_EVENT_FLAGS, u32) {
    match (button, pressed) {
        (Button::Left, true) => (MOUSEEVENTF_LEFTDOWN, 0),
        (Button::Left, false) => (MOUSEEVENTF_LEFTUP, 0),
        (Button::Right, true) => (MOUSEEVENTF_RIGHTDOWN, 0),
        (Button::Right, false) => (MOUSEEVENTF_RIGHTUP, 0),
        (Button::Middle, true) => (MOUSEEVENTF_MIDDLEDOWN, 0),
        (Button::Middle, false) => (MOUSEEVENTF_MIDDLEUP, 0),
        (Button::Button4, true) => (MOUSEEVENTF_XDOWN, 1),
        (Button::Button4, false) => (MOUSEEVENTF_XUP, 1),
        (Button::Button5, true) => (MOUSEEVENTF_XDOWN, 2),
        (Button::Button5, false) => (MOUSEEVENTF_XUP, 2),
        (Button::Unknown(code), true) => (MOUSEEVENTF_XDOWN, code as u32),
        (Button::Unknown(code), false) => (MOUSEEVENTF_XUP, code as u32),
    }
}

/// Map a coordinate onto the 0..=65535 range SendInput expects.
fn normalize(value: f64, origin: i32, extent: i32) -> i32 {
    if extent <= 1 || !value.is_finite() {
        return 0;
    }
    let offset = (value.round() - origin as f64).clamp(0.0, (extent - 1) as f64);
    ((offset * 65535.0) / (extent - 1) as f64).round() as i32
}

/// SendInput injection. The layout is read once when opened.
pub struct WindowsInput {
    layout: WindowsLayout,
}

impl WindowsInput {
    pub fn open() -> Result<Self> {
        Ok(Self {
            layout: WindowsLayout::load(),
        })
    }
}

impl KeyboardLayout for WindowsInput {
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

impl PlatformInput for WindowsInput {
    fn inject_key_event(&self, code: KeyCode, pressed: bool) -> Result<()> {
        let vk = u16::try_from(code)
            .map_err(|_| Error::Platform(format!("keycode {code} is not a virtual key")))?;
        sim_keyboard_event(vk, pressed)
    }

    fn inject_button_event(&self, button: Button, pressed: bool) -> Result<()> {
        let (flags, data) = button_flags(button, pressed);
        sim_mouse_event(flags, data, 0, 0)
    }

    fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        let (left, top, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };

        if width == 0 || height == 0 {
            return Err(Error::Platform("Failed to get screen metrics".into()));
        }

        sim_mouse_event(
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
            0,
            normalize(x, left, width),
            normalize(y, top, height),
        )
    }

    fn scroll(&self, vertical: i32, horizontal: i32) -> Result<()> {
        if vertical != 0 {
            sim_mouse_event(
                MOUSEEVENTF_WHEEL,
                vertical.wrapping_mul(WHEEL_DELTA) as u32,
                0,
                0,
            )?;
        }
        if horizontal != 0 {
            sim_mouse_event(
                MOUSEEVENTF_HWHEEL,
                horizontal.wrapping_mul(WHEEL_DELTA) as u32,
                0,
                0,
            )?;
        }
        Ok(())
    }

    fn pointer_position(&self) -> Result<(f64, f64)> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| Error::Platform(format!("GetCursorPos failed: {e}")))?;
        Ok((point.x as f64, point.y as f64))
    }

    fn screen_size(&self) -> Result<(f64, f64)> {
        let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
        let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
        if width == 0 || height == 0 {
            return Err(Error::Platform("Failed to get screen metrics".into()));
        }
        Ok((width as f64, height as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_flags() {
        assert_eq!(button_flags(Button::Left, true), (MOUSEEVENTF_LEFTDOWN, 0));
        assert_eq!(button_flags(Button::Middle, false), (MOUSEEVENTF_MIDDLEUP, 0));
        assert_eq!(button_flags(Button::Button5, true), (MOUSEEVENTF_XDOWN, 2));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(0.0, 0, 1920), 0);
        assert_eq!(normalize(1919.0, 0, 1920), 65535);
        assert_eq!(normalize(-50.0, 0, 1920), 0);
        assert_eq!(normalize(0.0, -1920, 3840), 32776);
    }
}
