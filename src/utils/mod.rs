pub mod permissions;

use tracing::{error, info};

/// Run one startup step, logging "<name>..." and its outcome.
pub fn step<T, E, F>(name: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    info!("{}...", name);
    match f() {
        Ok(value) => {
            info!("{}: ok", name);
            Ok(value)
        }
        Err(e) => {
            error!("{}: failed: {}", name, e);
            Err(e)
        }
    }
}

// Guards for formatting that is too costly to do when the level is off
#[macro_export]
macro_rules! debug_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! trace_if_enabled {
    ($($arg:tt)*) => {
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!($($arg)*);
        }
    };
}
