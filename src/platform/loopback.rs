//! In-memory backend.
//!
//! [`LoopbackInput`] records every injected event instead of sending it to
//! the OS, and [`LoopbackSource`] replays raw events pushed through a
//! [`LoopbackSender`]. Both use [`UsLayout`] unless told otherwise. An input
//! can echo its key and button injections into a source, which closes the
//! loop between the synthesizers and the listener without a display server.

use super::{EventSource, KeyboardLayout, PlatformInput};
use crate::error::{Error, Result};
use crate::event::{Button, KeyCode, RawEvent};
use crate::keysym::Keysym;
use crate::layout::UsLayout;
use crate::modifier::{LockStyle, ModifierKeycodes};
use log::trace;
use std::ops::RangeInclusive;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// An event recorded by [`LoopbackInput`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyntheticEvent {
    Key { code: KeyCode, pressed: bool },
    Button { button: Button, pressed: bool },
    Move { x: f64, y: f64 },
    Scroll { vertical: i32, horizontal: i32 },
}

impl SyntheticEvent {
    pub fn key(code: KeyCode, pressed: bool) -> Self {
        SyntheticEvent::Key { code, pressed }
    }

    pub fn button(button: Button, pressed: bool) -> Self {
        SyntheticEvent::Button { button, pressed }
    }
}

/// Create a connected sender/source pair on the default layout.
pub fn channel() -> (LoopbackSender, LoopbackSource) {
    LoopbackSource::with_layout(UsLayout::new())
}

/// Feeds raw events into a [`LoopbackSource`].
#[derive(Debug, Clone)]
pub struct LoopbackSender {
    tx: Sender<Result<RawEvent>>,
}

impl LoopbackSender {
    /// Queue an event. Fails once the source has been dropped.
    pub fn send(&self, event: RawEvent) -> Result<()> {
        self.push(Ok(event))
    }

    /// Make the source's next poll fail with `error`, as a lost device would.
    pub fn fail(&self, error: Error) -> Result<()> {
        self.push(Err(error))
    }

    fn push(&self, item: Result<RawEvent>) -> Result<()> {
        self.tx
            .send(item)
            .map_err(|_| Error::ThreadError("loopback source dropped".into()))
    }
}

/// Event source replaying queued raw events.
#[derive(Debug)]
pub struct LoopbackSource<L = UsLayout> {
    layout: L,
    rx: Receiver<Result<RawEvent>>,
}

impl<L: KeyboardLayout> LoopbackSource<L> {
    pub fn with_layout(layout: L) -> (LoopbackSender, Self) {
        let (tx, rx) = mpsc::channel();
        (LoopbackSender { tx }, Self { layout, rx })
    }
}

impl<L: KeyboardLayout> KeyboardLayout for LoopbackSource<L> {
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

impl<L: KeyboardLayout> EventSource for LoopbackSource<L> {
    /// Once every sender is gone the source goes quiet: each poll waits out
    /// its timeout and returns `None`.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<RawEvent>> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => item.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

/// Injection backend that records instead of injecting.
#[derive(Debug)]
pub struct LoopbackInput<L = UsLayout> {
    layout: L,
    events: Mutex<Vec<SyntheticEvent>>,
    pointer: Mutex<(f64, f64)>,
    screen: (f64, f64),
    echo: Option<Mutex<LoopbackSender>>,
}

impl Default for LoopbackInput {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackInput {
    /// A 1920x1080 screen with the pointer at the origin.
    pub fn new() -> Self {
        Self::with_layout(UsLayout::new())
    }
}

impl<L: KeyboardLayout> LoopbackInput<L> {
    pub fn with_layout(layout: L) -> Self {
        Self {
            layout,
            events: Mutex::new(Vec::new()),
            pointer: Mutex::new((0.0, 0.0)),
            screen: (1920.0, 1080.0),
            echo: None,
        }
    }

    pub fn with_screen_size(mut self, width: f64, height: f64) -> Self {
        self.screen = (width, height);
        self
    }

    /// Also deliver injected key, button and motion events to a source.
    pub fn with_echo(mut self, sender: LoopbackSender) -> Self {
        self.echo = Some(Mutex::new(sender));
        self
    }

    /// Drain the recorded events.
    pub fn take_events(&self) -> Vec<SyntheticEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Only the key events, in order, as `(code, pressed)`.
    pub fn take_key_events(&self) -> Vec<(KeyCode, bool)> {
        self.take_events()
            .into_iter()
            .filter_map(|event| match event {
                SyntheticEvent::Key { code, pressed } => Some((code, pressed)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SyntheticEvent, raw: Option<RawEvent>) -> Result<()> {
        trace!("loopback: {event:?}");
        self.events
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))?
            .push(event);
        if let (Some(echo), Some(raw)) = (&self.echo, raw) {
            echo.lock()
                .map_err(|_| Error::ThreadError("mutex poisoned".into()))?
                .send(raw)?;
        }
        Ok(())
    }

    fn pointer(&self) -> Result<(f64, f64)> {
        self.pointer
            .lock()
            .map(|p| *p)
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))
    }
}

impl<L: KeyboardLayout> KeyboardLayout for LoopbackInput<L> {
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

impl<L: KeyboardLayout + Send + Sync> PlatformInput for LoopbackInput<L> {
    fn inject_key_event(&self, code: KeyCode, pressed: bool) -> Result<()> {
        self.record(
            SyntheticEvent::Key { code, pressed },
            Some(RawEvent::Key { code, pressed }),
        )
    }

    fn inject_button_event(&self, button: Button, pressed: bool) -> Result<()> {
        let (x, y) = self.pointer()?;
        self.record(
            SyntheticEvent::Button { button, pressed },
            Some(RawEvent::Button {
                button,
                pressed,
                x,
                y,
            }),
        )
    }

    fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        let clamped = (x.clamp(0.0, self.screen.0), y.clamp(0.0, self.screen.1));
        *self
            .pointer
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = clamped;
        self.record(
            SyntheticEvent::Move { x, y },
            Some(RawEvent::Motion {
                x: clamped.0,
                y: clamped.1,
            }),
        )
    }

    fn scroll(&self, vertical: i32, horizontal: i32) -> Result<()> {
        self.record(
            SyntheticEvent::Scroll {
                vertical,
                horizontal,
            },
            None,
        )
    }

    fn pointer_position(&self) -> Result<(f64, f64)> {
        self.pointer()
    }

    fn screen_size(&self) -> Result<(f64, f64)> {
        Ok(self.screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_injections_in_order() {
        let input = LoopbackInput::new();
        input.inject_key_event(38, true).unwrap();
        input.inject_key_event(38, false).unwrap();
        input.move_pointer(10.0, 20.0).unwrap();
        assert_eq!(
            input.take_events(),
            vec![
                SyntheticEvent::key(38, true),
                SyntheticEvent::key(38, false),
                SyntheticEvent::Move { x: 10.0, y: 20.0 },
            ]
        );
        assert!(input.take_events().is_empty());
    }

    #[test]
    fn test_pointer_is_clamped_to_screen() {
        let input = LoopbackInput::new().with_screen_size(100.0, 50.0);
        input.move_pointer(500.0, -3.0).unwrap();
        assert_eq!(input.pointer_position().unwrap(), (100.0, 0.0));
    }

    #[test]
    fn test_source_times_out_and_replays() {
        let (tx, mut source) = channel();
        assert_eq!(source.poll_event(Duration::from_millis(1)).unwrap(), None);
        tx.send(RawEvent::key_pressed(9)).unwrap();
        assert_eq!(
            source.poll_event(Duration::from_millis(1)).unwrap(),
            Some(RawEvent::key_pressed(9))
        );
    }

    #[test]
    fn test_queued_failure_is_returned() {
        let (tx, mut source) = channel();
        tx.fail(Error::Platform("device gone".into())).unwrap();
        assert!(matches!(
            source.poll_event(Duration::from_millis(1)),
            Err(Error::Platform(_))
        ));
    }

    #[test]
    fn test_echo_feeds_source() {
        let (tx, mut source) = channel();
        let input = LoopbackInput::new().with_echo(tx);
        input.inject_key_event(36, true).unwrap();
        assert_eq!(
            source.poll_event(Duration::from_millis(10)).unwrap(),
            Some(RawEvent::key_pressed(36))
        );
    }
}
