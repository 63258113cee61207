//! Channel-based event receiving for non-blocking event processing.
//!
//! These are alternatives to the callback-based [`Listener`]: the listener
//! thread pushes decoded events into a channel and the caller drains it at
//! its own pace.
//!
//! # Example (Sync)
//!
//! ```no_run
//! use userinput::ListenerConfig;
//! use userinput::channel::listen_channel;
//! use std::time::Duration;
//!
//! let (handle, rx) = listen_channel(ListenerConfig::new(), 100)?;
//!
//! while handle.is_running() {
//!     if let Ok(event) = rx.recv_timeout(Duration::from_millis(100)) {
//!         println!("{event:?}");
//!     }
//! }
//! # Ok::<(), userinput::Error>(())
//! ```
//!
//! # Example (Async with Tokio)
//!
//! ```ignore
//! use userinput::ListenerConfig;
//! use userinput::channel::listen_async_channel;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (handle, mut rx) = listen_async_channel(ListenerConfig::new(), 100)
//!         .expect("Failed to start listener");
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{event:?}");
//!     }
//! }
//! ```

use crate::error::Result;
use crate::event::InputEvent;
use crate::listener::{EventHandler, Listener, ListenerConfig, StopHandle};
use crate::platform::{self, EventSource};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};

/// Handle to control a channel-based listener.
///
/// The listener also stops when this handle is dropped.
pub struct ChannelHandle {
    listener: Listener,
}

impl ChannelHandle {
    /// Stop the listener and wait for the background thread to finish.
    ///
    /// Returns the capture loop's result, so a listener that already died on
    /// a platform error reports that error here.
    pub fn stop(self) -> Result<()> {
        self.listener.stop()
    }

    /// Check if the listener is still running.
    pub fn is_running(&self) -> bool {
        self.listener.is_running()
    }

    /// A handle that stops the listener without consuming this one.
    pub fn stop_handle(&self) -> StopHandle {
        self.listener.stop_handle()
    }
}

/// Handler that sends events to a bounded sync channel.
struct ChannelHandler {
    sender: SyncSender<InputEvent>,
}

impl EventHandler for ChannelHandler {
    fn handle_event(&mut self, event: &InputEvent) {
        // Drop the event rather than stall the capture loop on a slow consumer.
        let _ = self.sender.try_send(event.clone());
    }
}

/// Handler that sends events to an unbounded sync channel.
struct UnboundedChannelHandler {
    sender: Sender<InputEvent>,
}

impl EventHandler for UnboundedChannelHandler {
    fn handle_event(&mut self, event: &InputEvent) {
        let _ = self.sender.send(event.clone());
    }
}

fn spawn<S, F, H>(config: ListenerConfig, open: F, handler: H) -> Result<ChannelHandle>
where
    S: EventSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
    H: EventHandler + 'static,
{
    let listener = Listener::new(config);
    listener.start_with(open, handler)?;
    Ok(ChannelHandle { listener })
}

/// Start a native listener that sends events to a bounded channel.
///
/// If the buffer is full, new events are dropped rather than blocking input.
pub fn listen_channel(
    config: ListenerConfig,
    capacity: usize,
) -> Result<(ChannelHandle, Receiver<InputEvent>)> {
    let options = config.capture_options();
    let open = move || platform::open_event_source(options);
    listen_channel_with(config, capacity, open)
}

/// Like [`listen_channel`], for any event source.
pub fn listen_channel_with<S, F>(
    config: ListenerConfig,
    capacity: usize,
    open: F,
) -> Result<(ChannelHandle, Receiver<InputEvent>)>
where
    S: EventSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(capacity);
    let handle = spawn(config, open, ChannelHandler { sender })?;
    Ok((handle, receiver))
}

/// Start a native listener that sends events to an unbounded channel.
///
/// No event is ever dropped; watch memory use if the consumer is slow.
pub fn listen_unbounded_channel(
    config: ListenerConfig,
) -> Result<(ChannelHandle, Receiver<InputEvent>)> {
    let options = config.capture_options();
    listen_unbounded_channel_with(config, move || platform::open_event_source(options))
}

/// Like [`listen_unbounded_channel`], for any event source.
pub fn listen_unbounded_channel_with<S, F>(
    config: ListenerConfig,
    open: F,
) -> Result<(ChannelHandle, Receiver<InputEvent>)>
where
    S: EventSource + 'static,
    F: FnOnce() -> Result<S> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let handle = spawn(config, open, UnboundedChannelHandler { sender })?;
    Ok((handle, receiver))
}

// ============================================================================
// Tokio async support (behind feature flag)
// ============================================================================

#[cfg(feature = "tokio")]
pub use tokio_channel::*;

#[cfg(feature = "tokio")]
mod tokio_channel {
    use super::*;
    use tokio::sync::mpsc as tokio_mpsc;

    /// Handler that sends events to a tokio async channel.
    struct TokioChannelHandler {
        sender: tokio_mpsc::Sender<InputEvent>,
    }

    impl EventHandler for TokioChannelHandler {
        fn handle_event(&mut self, event: &InputEvent) {
            // Use try_send to avoid blocking the listener thread
            let _ = self.sender.try_send(event.clone());
        }
    }

    /// Start a native listener that sends events to a tokio channel.
    pub fn listen_async_channel(
        config: ListenerConfig,
        capacity: usize,
    ) -> Result<(ChannelHandle, tokio_mpsc::Receiver<InputEvent>)> {
        let options = config.capture_options();
        listen_async_channel_with(config, capacity, move || {
            platform::open_event_source(options)
        })
    }

    /// Like [`listen_async_channel`], for any event source.
    pub fn listen_async_channel_with<S, F>(
        config: ListenerConfig,
        capacity: usize,
        open: F,
    ) -> Result<(ChannelHandle, tokio_mpsc::Receiver<InputEvent>)>
    where
        S: EventSource + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (sender, receiver) = tokio_mpsc::channel(capacity);
        let handle = spawn(config, open, TokioChannelHandler { sender })?;
        Ok((handle, receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::event::{KeySymbol, RawEvent};
    use crate::listener::EscapePredicate;
    use crate::platform::loopback;
    use std::time::Duration;

    fn config() -> ListenerConfig {
        ListenerConfig::new()
            .poll_interval(Duration::from_millis(5))
            .escape(EscapePredicate::Never)
    }

    #[test]
    fn test_bounded_channel_receives_events() {
        let (tx, source) = loopback::channel();
        let (handle, rx) = listen_channel_with(config(), 8, move || Ok(source)).unwrap();

        tx.send(RawEvent::key_pressed(24)).unwrap();
        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(event.as_key().unwrap().symbol, KeySymbol::Char('q'));

        assert!(handle.is_running());
        handle.stop().unwrap();
    }

    #[test]
    fn test_unbounded_channel_closes_after_stop() {
        let (tx, source) = loopback::channel();
        let (handle, rx) = listen_unbounded_channel_with(config(), move || Ok(source)).unwrap();

        tx.send(RawEvent::Motion { x: 3.0, y: 4.0 }).unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            InputEvent::Motion { x: 3.0, y: 4.0 }
        );

        handle.stop().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
    }

    #[test]
    fn test_stop_reports_platform_failure() {
        let (tx, source) = loopback::channel();
        let (handle, _rx) = listen_unbounded_channel_with(config(), move || Ok(source)).unwrap();

        tx.fail(Error::Platform("device gone".into())).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while handle.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }

        assert!(!handle.is_running());
        assert!(matches!(handle.stop(), Err(Error::Platform(_))));
    }
}
