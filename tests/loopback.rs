//! End-to-end tests through the in-memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use userinput::platform::loopback::{self, LoopbackInput, LoopbackSource, SyntheticEvent};
use userinput::{
    Button, Error, EscapePredicate, InputEvent, KeySymbol, KeyTable, Keyboard, Listener,
    ListenerConfig, Modifier, Mouse, RawEvent, UsLayout,
};

const SHIFT_L: u32 = 50;
const CAPS_LOCK: u32 = 66;
const ESCAPE: u32 = 9;

fn config() -> ListenerConfig {
    ListenerConfig::new().poll_interval(Duration::from_millis(5))
}

fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the listener");
        thread::sleep(Duration::from_millis(2));
    }
}

fn pressed_chars(events: &[InputEvent]) -> String {
    events
        .iter()
        .filter_map(InputEvent::as_key)
        .filter(|key| key.pressed)
        .filter_map(|key| key.symbol.as_char())
        .collect()
}

#[test]
fn typed_text_is_decoded_by_listener() {
    let (tx, source) = loopback::channel();
    let keyboard = Keyboard::with_platform(LoopbackInput::new().with_echo(tx)).unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let listener = Listener::new(config().escape(EscapePredicate::Never));
    let record = move |event: &InputEvent| sink.lock().unwrap().push(event.clone());
    listener.start_with(move || Ok(source), record).unwrap();

    let text = "Hello, World! (a < b)";
    keyboard.type_string(text, Duration::ZERO).unwrap();

    wait_until(|| pressed_chars(&events.lock().unwrap()).len() == text.chars().count());
    listener.stop().unwrap();

    assert_eq!(pressed_chars(&events.lock().unwrap()), text);
}

#[test]
fn mixed_case_toggles_shift_once_per_run() {
    let keyboard = Keyboard::with_platform(LoopbackInput::new()).unwrap();
    keyboard.type_string("Ab", Duration::ZERO).unwrap();
    let a = 38;
    let b = 56;
    assert_eq!(
        keyboard.platform().take_key_events(),
        vec![
            (SHIFT_L, true),
            (a, true),
            (a, false),
            (SHIFT_L, false),
            (b, true),
            (b, false),
        ]
    );

    keyboard.type_string("AB", Duration::ZERO).unwrap();
    let events = keyboard.platform().take_key_events();
    let shift_presses = events.iter().filter(|e| **e == (SHIFT_L, true)).count();
    let shift_releases = events.iter().filter(|e| **e == (SHIFT_L, false)).count();
    assert_eq!((shift_presses, shift_releases), (1, 1));
    assert_eq!(events.first(), Some(&(SHIFT_L, true)));
    assert_eq!(events.last(), Some(&(SHIFT_L, false)));
}

#[test]
fn unknown_symbol_types_nothing() {
    let keyboard = Keyboard::with_platform(LoopbackInput::new()).unwrap();

    let err = keyboard
        .type_string("ab\u{1F701}", Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownSymbol(_)));
    assert!(keyboard.platform().take_events().is_empty());

    let table = KeyTable::build(&UsLayout::new()).unwrap();
    assert!(matches!(
        table.resolve(&KeySymbol::Char('\u{1F701}')),
        Err(Error::UnknownSymbol(_))
    ));
    assert!(matches!(
        keyboard.press_key("NoSuchKey"),
        Err(Error::UnknownSymbol(_))
    ));
}

#[test]
fn modifier_toggle_law() {
    let table = KeyTable::build(&UsLayout::new()).unwrap();
    let mut tracker = table.modifier_tracker();

    let before = tracker.state();
    tracker.update(SHIFT_L, true);
    assert!(tracker.is_set(Modifier::Shift));
    tracker.update(SHIFT_L, false);
    assert_eq!(tracker.state(), before);

    // X servers lock on the first press and unlock on the second release.
    tracker.update(CAPS_LOCK, true);
    assert!(tracker.is_set(Modifier::Lock));
    tracker.update(CAPS_LOCK, false);
    assert!(tracker.is_set(Modifier::Lock));
    tracker.update(CAPS_LOCK, true);
    assert!(tracker.is_set(Modifier::Lock));
    tracker.update(CAPS_LOCK, false);
    assert!(!tracker.is_set(Modifier::Lock));
}

#[test]
fn stop_from_another_thread_ends_dispatch() {
    let (tx, source) = loopback::channel();
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();

    let listener = Listener::new(config().escape(EscapePredicate::Never));
    let counter = move |_: &InputEvent| {
        seen.fetch_add(1, Ordering::SeqCst);
    };
    listener.start_with(move || Ok(source), counter).unwrap();

    tx.send(RawEvent::key_pressed(38)).unwrap();
    wait_until(|| count.load(Ordering::SeqCst) == 1);

    let handle = listener.stop_handle();
    thread::spawn(move || handle.stop()).join().unwrap();
    assert!(!listener.is_running());
    listener.stop().unwrap();

    let _ = tx.send(RawEvent::key_pressed(38));
    thread::sleep(Duration::from_millis(30));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn escape_key_stops_without_dispatch() {
    let (tx, source) = loopback::channel();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let listener = Listener::new(config());
    let record = move |event: &InputEvent| sink.lock().unwrap().push(event.clone());
    listener.start_with(move || Ok(source), record).unwrap();

    tx.send(RawEvent::key_pressed(38)).unwrap();
    tx.send(RawEvent::key_pressed(ESCAPE)).unwrap();
    listener.join().unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_key().map(|k| k.code), Some(38));
}

#[test]
fn caps_lock_changes_letters_only() {
    let (tx, source) = LoopbackSource::with_layout(UsLayout::new());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let listener = Listener::new(config().escape(EscapePredicate::Never));
    let record = move |event: &InputEvent| sink.lock().unwrap().push(event.clone());
    listener.start_with(move || Ok(source), record).unwrap();

    for (code, pressed) in [(CAPS_LOCK, true), (CAPS_LOCK, false), (38, true), (10, true)] {
        tx.send(RawEvent::Key { code, pressed }).unwrap();
    }
    wait_until(|| events.lock().unwrap().len() == 4);
    listener.stop().unwrap();

    assert_eq!(pressed_chars(&events.lock().unwrap()), "A1");
}

#[test]
fn mouse_click_moves_once() {
    let mouse = Mouse::with_platform(LoopbackInput::new());
    mouse.click(100.0, 200.0, Button::Left, 2).unwrap();

    assert_eq!(
        mouse.platform().take_events(),
        vec![
            SyntheticEvent::Move { x: 100.0, y: 200.0 },
            SyntheticEvent::button(Button::Left, true),
            SyntheticEvent::button(Button::Left, false),
            SyntheticEvent::button(Button::Left, true),
            SyntheticEvent::button(Button::Left, false),
        ]
    );
    assert_eq!(mouse.position().unwrap(), (100.0, 200.0));

    mouse.scroll(0, 0).unwrap();
    assert!(mouse.platform().take_events().is_empty());
}
