//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (the session controller, the audio engine thread) declare
//! the flag once and log through these macros, so their output can be muted
//! without touching `RUST_LOG`:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("session {} started", session_id);
//! ```

/// Shared expansion for the level-specific macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! log_if_enabled {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(warn, $($arg)*)
    };
}

/// Modules that swallow failures at their boundary should keep
/// `ENABLE_LOGS` on, otherwise this is the only trace of the failure.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::log_if_enabled!(error, $($arg)*)
    };
}
