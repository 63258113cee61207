//! Log clicks with their positions, starting with the screen size.
//!
//! Run with: RUST_LOG=info cargo run --example mouse
//!
//! Stops on Ctrl+C.

use log::{error, info};
use userinput::{EscapePredicate, InputEvent, Listener, ListenerConfig, Mouse};

fn main() {
    env_logger::init();

    match Mouse::new().and_then(|mouse| mouse.screen_size()) {
        Ok((width, height)) => {
            info!(r#"{{ "event": "start", "type": "size", "value": "{width}x{height}" }}"#)
        }
        Err(e) => {
            error!(r#"{{ "event": "exception", "type": "size", "value": "{e}" }}"#);
            return;
        }
    }

    let listener = Listener::new(ListenerConfig::new().escape(EscapePredicate::Never));
    let stop = listener.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.stop()) {
        error!("Failed to install Ctrl+C handler: {e}");
    }

    let result = listener.run(|event: &InputEvent| {
        if let InputEvent::Button { pressed, x, y, .. } = event {
            let kind = if *pressed { "press" } else { "release" };
            info!(r#"{{ "event": "click", "type": "{kind}", "x": "{x}", "y": "{y}" }}"#);
        }
    });

    if let Err(e) = result {
        error!("{e}");
    }
}
