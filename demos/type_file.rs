//! Type out a text file as keystrokes.
//!
//! Run with: cargo run --example type_file -- <file> [interval-seconds] [pause-seconds]
//!
//! Typing starts after the pause, so there is time to focus the target
//! window. Any mouse button press aborts between lines.

use std::io::{BufRead, BufReader};
use std::time::Duration;
use std::{env, fs, process, thread};
use userinput::{EscapePredicate, InputEvent, Keyboard, Listener, ListenerConfig, RawEvent};

fn seconds(arg: Option<String>, default: f64, name: &str) -> Duration {
    match arg.map(|value| value.parse::<f64>()) {
        None => Duration::from_secs_f64(default),
        Some(Ok(value)) if value >= 0.0 => Duration::from_secs_f64(value),
        Some(_) => {
            eprintln!("The value of {name} must be a non-negative number");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: type_file <file> [interval] [pause]");
        process::exit(1);
    };
    let interval = seconds(args.next(), 0.1, "interval");
    let pause = seconds(args.next(), 5.0, "pause");

    let file = match fs::File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open {path}: {e}");
            process::exit(1);
        }
    };

    let keyboard = match Keyboard::new() {
        Ok(keyboard) => keyboard,
        Err(e) => {
            eprintln!("Failed to open keyboard: {e}");
            process::exit(1);
        }
    };

    // Any button press stops the abort listener; Escape is typed, not watched.
    let stop_on_click = EscapePredicate::custom(|event| {
        matches!(event, RawEvent::Button { pressed: true, .. })
    });
    let abort = Listener::new(ListenerConfig::new().escape(stop_on_click));
    if let Err(e) = abort.start(|_: &InputEvent| {}) {
        eprintln!("Failed to start listener: {e}");
        process::exit(1);
    }

    let delay = pause.as_secs_f64();
    println!("Typing will begin in {delay:.1} seconds...");
    thread::sleep(pause);

    for line in BufReader::new(file).lines() {
        if !abort.is_running() {
            println!("Typing aborted!");
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Failed to read {path}: {e}");
                break;
            }
        };
        let result = keyboard
            .type_string(&line, interval)
            .and_then(|_| keyboard.tap_key("Return", 1, interval));
        if let Err(e) = result {
            eprintln!("Typing failed: {e}");
            break;
        }
    }

    let _ = abort.stop();
}
