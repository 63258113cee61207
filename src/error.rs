//! Error types for input synthesis and listening.

use crate::keysym::Keysym;
use thiserror::Error;

/// Result type alias for userinput operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, injecting or capturing input.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested logical key has no keycode on the active layout.
    #[error("unknown key symbol: {0}")]
    UnknownSymbol(String),

    /// A received keycode could not be translated into a character or key name.
    #[error("unresolved keycode {keycode} (keysym {keysym})")]
    UnresolvedKeycode {
        /// The platform keycode that was received.
        keycode: u32,
        /// The keysym the layout produced for it, `NoSymbol` if none.
        keysym: Keysym,
    },

    /// The underlying OS call failed.
    #[error("platform error: {0}")]
    Platform(String),

    /// The listener is already running.
    #[error("listener is already running")]
    AlreadyRunning,

    /// The listener is not running.
    #[error("listener is not running")]
    NotRunning,

    /// The operation requires elevated permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),

    /// The requested feature is not supported on this platform.
    #[error("not supported: {0}")]
    NotSupported(String),
}
