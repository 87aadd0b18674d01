use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Result type used throughout the crate and by the programs that use it.
pub type SkaiNetResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Clone, Copy)]
pub struct SkaiNetError {
    pub msg: &'static str,
}

impl Display for SkaiNetError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.msg)
    }
}

impl Error for SkaiNetError {}

/**
 * A failed call to the remote message source.
 *
 * The Display text is what gets stored as the store's error state, so keep it readable.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never completed (refused, timed out, DNS, ...).
    Connection(String),
    /// The server answered with a non-2xx status.
    Status { code: u16, message: String },
    /// The server answered but the body could not be understood.
    Protocol(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            RemoteError::Connection(msg) => write!(f, "connection failed: {}", msg),
            RemoteError::Status { code, message } if message.is_empty() => {
                write!(f, "server returned status {}", code)
            }
            RemoteError::Status { code, message } => {
                write!(f, "server returned status {}: {}", code, message)
            }
            RemoteError::Protocol(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

impl Error for RemoteError {}
