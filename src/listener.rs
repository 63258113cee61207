//! The listener: a capture loop on a dedicated thread that decodes raw
//! platform events and hands them to a handler.

use crate::decode::Decoder;
use crate::error::{Error, Result};
use crate::event::{InputEvent, KeyCode, RawEvent};
use crate::keymap::KeyTable;
use crate::platform::{self, CaptureOptions, EventSource};
use log::{debug, trace, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

/// Trait for handling decoded input events.
///
/// Handlers run on the listener's thread, one event at a time.
pub trait EventHandler: Send {
    /// Called for every event the listener dispatches.
    fn handle_event(&mut self, event: &InputEvent);
}

/// Implement EventHandler for closures.
impl<F> EventHandler for F
where
    F: FnMut(&InputEvent) + Send,
{
    fn handle_event(&mut self, event: &InputEvent) {
        self(event);
    }
}

/// Decides which raw event ends a listening session.
///
/// The matching event is not dispatched.
#[derive(Clone, Default)]
pub enum EscapePredicate {
    /// A press of the layout's Escape key.
    #[default]
    EscapeKey,
    /// Run until stopped.
    Never,
    /// Any caller-defined condition.
    Custom(Arc<dyn Fn(&RawEvent) -> bool + Send + Sync>),
}

impl EscapePredicate {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&RawEvent) -> bool + Send + Sync + 'static,
    {
        EscapePredicate::Custom(Arc::new(predicate))
    }

    fn matches(&self, event: &RawEvent, escape: Option<KeyCode>) -> bool {
        match self {
            EscapePredicate::EscapeKey => matches!(
                event,
                RawEvent::Key { code, pressed: true } if Some(*code) == escape
            ),
            EscapePredicate::Never => false,
            EscapePredicate::Custom(predicate) => predicate(event),
        }
    }
}

impl fmt::Debug for EscapePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscapePredicate::EscapeKey => f.write_str("EscapeKey"),
            EscapePredicate::Never => f.write_str("Never"),
            EscapePredicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    capture: bool,
    capture_move: bool,
    poll_interval: Duration,
    escape: EscapePredicate,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            capture: false,
            capture_move: false,
            poll_interval: Duration::from_millis(50),
            escape: EscapePredicate::default(),
        }
    }
}

impl ListenerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep key and button events from reaching other applications.
    ///
    /// Supported by the X11 backend through active grabs and by the Windows
    /// and macOS hooks.
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Keep pointer motion from reaching other applications.
    pub fn capture_move(mut self, capture_move: bool) -> Self {
        self.capture_move = capture_move;
        self
    }

    /// Upper bound on how long a stop request can go unnoticed.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn escape(mut self, escape: EscapePredicate) -> Self {
        self.escape = escape;
        self
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            capture: self.capture,
            capture_move: self.capture_move,
        }
    }
}

/// Stops a listener from any thread, including from inside its own handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the loop to exit. It notices within one poll interval.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Captures input events and dispatches them to a handler.
///
/// # Example
///
/// ```no_run
/// use userinput::{InputEvent, Listener, ListenerConfig};
///
/// let listener = Listener::new(ListenerConfig::new());
/// listener.start(|event: &InputEvent| {
///     if let InputEvent::Key(key) = event {
///         println!("{} {}", key.symbol, if key.pressed { "down" } else { "up" });
///     }
/// })?;
/// std::thread::sleep(std::time::Duration::from_secs(10));
/// listener.stop()?;
/// # Ok::<(), userinput::Error>(())
/// ```
pub struct Listener {
    config: ListenerConfig,
    running: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Default for Listener {
    fn default() -> Self {
        Self::new(ListenerConfig::default())
    }
}

impl Listener {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Start listening to the native event source in a background thread.
    ///
    /// Returns once the source is open and the key tables are built; failures
    /// doing either are returned here.
    pub fn start<H: EventHandler + 'static>(&self, handler: H) -> Result<()> {
        let options = self.config.capture_options();
        self.start_with(move || platform::open_event_source(options), handler)
    }

    /// Start listening to the source `open` creates, in a background thread.
    ///
    /// `open` runs on the listener thread. If the previous session ended on
    /// its own with an error that nobody collected through [`stop`](Self::stop)
    /// or [`join`](Self::join), that error is returned instead and the listener
    /// stays stopped; the next call starts normally.
    pub fn start_with<S, F, H>(&self, open: F, mut handler: H) -> Result<()>
    where
        S: EventSource + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
        H: EventHandler + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        let mut slot = self.lock_handle()?;
        if let Some(stale) = slot.take()
            && let Err(err) = join_worker(stale)
        {
            warn!("previous listener session failed: {err}");
            self.running.store(false, Ordering::SeqCst);
            return Err(err);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let running = self.running.clone();
        let config = self.config.clone();
        let handle = std::thread::spawn(move || {
            let opened = open().and_then(|source| {
                let table = KeyTable::build(&source)?;
                Ok((source, table))
            });
            let (mut source, table) = match opened {
                Ok(opened) => {
                    let _ = ready_tx.send(Ok(()));
                    opened
                }
                Err(err) => {
                    running.store(false, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(err));
                    return Ok(());
                }
            };
            let result = capture_loop(&mut source, table, &config, &running, &mut handler);
            running.store(false, Ordering::SeqCst);
            result
        });
        // Published before startup completes so a concurrent stop() joins it.
        *slot = Some(handle);
        drop(slot);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                let handle = self.lock_handle()?.take();
                if let Some(handle) = handle {
                    join_worker(handle)?;
                }
                Err(err)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let handle = self.lock_handle()?.take();
                if let Some(handle) = handle {
                    join_worker(handle)?;
                }
                Err(Error::ThreadError("listener thread exited during startup".into()))
            }
        }
    }

    /// Listen to the native event source on the calling thread.
    ///
    /// Blocks until the escape event arrives or [`StopHandle::stop`] is called.
    pub fn run<H: EventHandler>(&self, handler: H) -> Result<()> {
        let options = self.config.capture_options();
        self.run_with(|| platform::open_event_source(options), handler)
    }

    /// Listen to the source `open` creates, on the calling thread.
    pub fn run_with<S, F, H>(&self, open: F, mut handler: H) -> Result<()>
    where
        S: EventSource,
        F: FnOnce() -> Result<S>,
        H: EventHandler,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        let result = open().and_then(|mut source| {
            let table = KeyTable::build(&source)?;
            capture_loop(&mut source, table, &self.config, &self.running, &mut handler)
        });
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// Stop the listener and wait for its thread.
    ///
    /// Returns the capture loop's own result, so a platform failure that ended
    /// the loop early surfaces here.
    pub fn stop(&self) -> Result<()> {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let handle = self.lock_handle()?.take();
        match handle {
            Some(handle) => join_worker(handle),
            None if was_running => Ok(()),
            None => Err(Error::NotRunning),
        }
    }

    /// Wait for the listener to end on its own (escape event or a
    /// [`StopHandle`]).
    pub fn join(&self) -> Result<()> {
        let handle = self.lock_handle()?.take().ok_or(Error::NotRunning)?;
        join_worker(handle)
    }

    /// A handle that can stop this listener from anywhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Check if the listener is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn lock_handle(&self) -> Result<std::sync::MutexGuard<'_, Option<JoinHandle<Result<()>>>>> {
        self.thread_handle
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))
    }
}

fn join_worker(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle
        .join()
        .map_err(|_| Error::ThreadError("failed to join listener thread".into()))?
}

impl Drop for Listener {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

fn capture_loop<S, H>(
    source: &mut S,
    table: KeyTable,
    config: &ListenerConfig,
    running: &AtomicBool,
    handler: &mut H,
) -> Result<()>
where
    S: EventSource + ?Sized,
    H: EventHandler + ?Sized,
{
    let escape = table.escape_keycode();
    let mut decoder = Decoder::new(table);
    debug!("listener started ({:?})", config.capture_options());

    while running.load(Ordering::SeqCst) {
        let Some(raw) = source.poll_event(config.poll_interval)? else {
            continue;
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }
        trace!("captured {raw:?}");

        if config.escape.matches(&raw, escape) {
            debug!("escape event received, stopping listener");
            running.store(false, Ordering::SeqCst);
            break;
        }

        let event = match raw {
            RawEvent::Key { code, pressed } => InputEvent::Key(decoder.decode_event(code, pressed)),
            RawEvent::Button {
                button,
                pressed,
                x,
                y,
            } => InputEvent::Button {
                button,
                pressed,
                x,
                y,
            },
            RawEvent::Motion { x, y } => InputEvent::Motion { x, y },
            RawEvent::Scroll { direction, x, y } => InputEvent::Scroll { direction, x, y },
        };
        handler.handle_event(&event);
    }

    debug!("listener stopped");
    Ok(())
}

/// Convenience function: listen to the native source with the default
/// configuration until Escape is pressed.
pub fn listen<H: EventHandler>(handler: H) -> Result<()> {
    Listener::default().run(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Button, KeySymbol};
    use crate::platform::loopback::{self, LoopbackSender, LoopbackSource};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn quick() -> ListenerConfig {
        ListenerConfig::new().poll_interval(Duration::from_millis(5))
    }

    fn collect(events: &Arc<Mutex<Vec<InputEvent>>>) -> impl FnMut(&InputEvent) + Send + 'static {
        let events = events.clone();
        move |event: &InputEvent| events.lock().unwrap().push(event.clone())
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn start(listener: &Listener, events: &Arc<Mutex<Vec<InputEvent>>>) -> LoopbackSender {
        let (tx, source) = loopback::channel();
        listener
            .start_with(move || Ok::<LoopbackSource, Error>(source), collect(events))
            .unwrap();
        tx
    }

    #[test]
    fn test_escape_stops_and_is_not_dispatched() {
        let listener = Listener::new(quick());
        let events = Arc::new(Mutex::new(Vec::new()));
        let tx = start(&listener, &events);

        tx.send(RawEvent::key_pressed(38)).unwrap();
        tx.send(RawEvent::key_pressed(9)).unwrap();
        tx.send(RawEvent::key_pressed(39)).unwrap();
        listener.join().unwrap();

        assert!(!listener.is_running());
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_key().unwrap().symbol, KeySymbol::Char('a'));
    }

    #[test]
    fn test_decodes_with_live_modifiers() {
        let listener = Listener::new(quick());
        let events = Arc::new(Mutex::new(Vec::new()));
        let tx = start(&listener, &events);

        for raw in [
            RawEvent::key_pressed(50),
            RawEvent::key_pressed(10),
            RawEvent::key_released(10),
            RawEvent::key_released(50),
            RawEvent::button_pressed(Button::Left, 1.0, 2.0),
        ] {
            tx.send(raw).unwrap();
        }
        wait_until(|| events.lock().unwrap().len() == 5);
        listener.stop().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[1].as_key().unwrap().symbol, KeySymbol::Char('!'));
        assert_eq!(
            events[4],
            InputEvent::Button {
                button: Button::Left,
                pressed: true,
                x: 1.0,
                y: 2.0,
            }
        );
    }

    #[test]
    fn test_stop_from_foreign_thread() {
        let listener = Listener::new(quick().escape(EscapePredicate::Never));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (tx, source) = loopback::channel();
        listener
            .start_with(move || Ok::<_, Error>(source), move |_: &InputEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        tx.send(RawEvent::key_pressed(38)).unwrap();
        wait_until(|| calls.load(Ordering::SeqCst) == 1);

        let handle = listener.stop_handle();
        let stopper = std::thread::spawn(move || handle.stop());
        stopper.join().unwrap();

        let started = Instant::now();
        wait_until(|| !listener.is_running());
        assert!(started.elapsed() < Duration::from_secs(1));

        let _ = tx.send(RawEvent::key_pressed(38));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        listener.join().unwrap();
    }

    #[test]
    fn test_custom_escape_predicate() {
        let right_click = EscapePredicate::custom(|event| {
            matches!(event, RawEvent::Button { button, .. } if *button == Button::Right)
        });
        let listener = Listener::new(quick().escape(right_click));
        let events = Arc::new(Mutex::new(Vec::new()));
        let tx = start(&listener, &events);

        tx.send(RawEvent::key_pressed(9)).unwrap();
        let click = RawEvent::button_pressed(Button::Right, 0.0, 0.0);
        tx.send(click).unwrap();
        listener.join().unwrap();
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_start_twice_fails() {
        let listener = Listener::new(quick());
        let events = Arc::new(Mutex::new(Vec::new()));
        let _tx = start(&listener, &events);
        let (_tx2, source) = loopback::channel();
        assert!(matches!(
            listener.start_with(move || Ok::<_, Error>(source), collect(&events)),
            Err(Error::AlreadyRunning)
        ));
        listener.stop().unwrap();
        assert!(matches!(listener.stop(), Err(Error::NotRunning)));
    }

    #[test]
    fn test_open_failure_is_reported() {
        let listener = Listener::new(quick());
        let result = listener.start_with(
            || Err::<LoopbackSource, _>(Error::Platform("no display".into())),
            |_: &InputEvent| {},
        );
        assert!(matches!(result, Err(Error::Platform(_))));
        assert!(!listener.is_running());
    }

    #[test]
    fn test_run_blocks_until_escape() {
        let listener = Listener::new(quick());
        let (tx, source) = loopback::channel();
        tx.send(RawEvent::key_pressed(38)).unwrap();
        tx.send(RawEvent::key_pressed(9)).unwrap();
        let mut seen = Vec::new();
        listener
            .run_with(|| Ok::<_, Error>(source), |event: &InputEvent| seen.push(event.clone()))
            .unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_restart_reports_failed_session() {
        let listener = Listener::new(quick().escape(EscapePredicate::Never));
        let (tx, source) = loopback::channel();
        listener
            .start_with(move || Ok::<_, Error>(source), |_: &InputEvent| {})
            .unwrap();

        tx.fail(Error::Platform("device gone".into())).unwrap();
        wait_until(|| !listener.is_running());
        assert!(!listener.is_running());

        let (_tx, source) = loopback::channel();
        assert!(matches!(
            listener.start_with(move || Ok::<_, Error>(source), |_: &InputEvent| {}),
            Err(Error::Platform(_))
        ));
        assert!(!listener.is_running());

        let (_tx, source) = loopback::channel();
        listener
            .start_with(move || Ok::<_, Error>(source), |_: &InputEvent| {})
            .unwrap();
        assert!(listener.is_running());
        listener.stop().unwrap();
    }

    #[test]
    fn test_stop_during_startup_joins_worker() {
        let listener = Listener::new(quick().escape(EscapePredicate::Never));
        let (_tx, source) = loopback::channel();

        std::thread::scope(|scope| {
            let stopper = scope.spawn(|| {
                wait_until(|| listener.is_running());
                listener.stop()
            });
            let open = move || {
                std::thread::sleep(Duration::from_millis(50));
                Ok::<_, Error>(source)
            };
            listener.start_with(open, |_: &InputEvent| {}).unwrap();
            stopper.join().unwrap().unwrap();
        });

        assert!(!listener.is_running());
        assert!(matches!(listener.join(), Err(Error::NotRunning)));
    }
}
