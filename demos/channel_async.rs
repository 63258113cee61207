//! Async channel example with Tokio.
//!
//! Run with: cargo run --example channel_async --features tokio
//!
//! Receives events in an async context until Escape is pressed.

use std::time::Duration;
use tokio::time::interval;
use userinput::channel::listen_async_channel;
use userinput::{InputEvent, ListenerConfig};

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("userinput channel example (async/tokio)");
    println!("Press Escape to exit.\n");

    let (handle, mut rx) = match listen_async_channel(ListenerConfig::new(), 100) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to start listener: {e}");
            return;
        }
    };

    let mut event_count = 0u32;
    let mut heartbeat = interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    println!("Channel closed, listener stopped.");
                    break;
                };
                event_count += 1;
                match event {
                    InputEvent::Key(key) if key.pressed => {
                        println!("[{event_count}] Key pressed: {}", key.symbol);
                    }
                    InputEvent::Button { button, pressed: true, x, y } => {
                        println!("[{event_count}] Mouse {button:?} pressed at ({x:.0}, {y:.0})");
                    }
                    _ => {}
                }
            }

            _ = heartbeat.tick() => {
                println!("... heartbeat (received {event_count} events so far)");
                if !handle.is_running() {
                    break;
                }
            }
        }
    }

    let _ = handle.stop();
}
