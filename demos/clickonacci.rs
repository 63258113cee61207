//! Print the next Fibonacci number on every left click; any other button exits.
//!
//! Run with: cargo run --example clickonacci

use userinput::{Button, EscapePredicate, InputEvent, Listener, ListenerConfig};

fn main() {
    env_logger::init();

    let listener = Listener::new(ListenerConfig::new().escape(EscapePredicate::Never));
    let stop = listener.stop_handle();

    let (mut a, mut b) = (0u64, 1u64);
    let result = listener.run(move |event: &InputEvent| match event {
        InputEvent::Button { button, .. } if *button != Button::Left => stop.stop(),
        InputEvent::Button { pressed: true, .. } => {
            println!("{a}");
            (a, b) = (b, a.saturating_add(b));
        }
        _ => {}
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }
}
