use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RwmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot connect to the display server: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),

    #[error("Display connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectionError),

    #[error("Display request failed: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("Another window manager is already running: {0}")]
    AnotherInstance(String),

    #[error("Could not bind control socket {path:?}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RwmError {
    pub fn bind(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RwmError::Bind {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RwmError>;

#[macro_export]
macro_rules! rwm_error {
    (another_instance, $($arg:tt)*) => {
        $crate::error::RwmError::AnotherInstance(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::RwmError::Internal(format!($($arg)*))
    };
}
