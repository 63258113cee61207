//! Print every captured input event until Escape or Ctrl+C.
//!
//! Run with: cargo run --example listen
//!
//! Note: On macOS, you need to grant Accessibility permissions to the terminal.

use userinput::{InputEvent, Listener, ListenerConfig};

fn main() {
    env_logger::init();

    println!("userinput listen example");
    println!("Press Escape or Ctrl+C to exit\n");

    let listener = Listener::new(ListenerConfig::new());
    let stop = listener.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.stop()) {
        eprintln!("Failed to install Ctrl+C handler: {e}");
    }

    let result = listener.run(|event: &InputEvent| match event {
        InputEvent::Key(key) => {
            let action = if key.pressed { "pressed" } else { "released" };
            println!(
                "Key {action}: {} (code {}, modifiers {:?})",
                key.symbol, key.code, key.modifiers
            );
        }
        InputEvent::Button {
            button,
            pressed,
            x,
            y,
        } => {
            let action = if *pressed { "pressed" } else { "released" };
            println!("Mouse {button:?} {action} at ({x:.0}, {y:.0})");
        }
        InputEvent::Motion { x, y } => println!("Mouse moved to ({x:.0}, {y:.0})"),
        InputEvent::Scroll { direction, x, y } => {
            println!("Wheel: {direction:?} at ({x:.0}, {y:.0})")
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }
}
