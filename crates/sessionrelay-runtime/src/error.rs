use std::fmt;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer.
#[derive(Debug)]
pub enum Error {
    /// Normalization layer error.
    Normalize(sessionrelay_normalize::Error),

    /// IO operation failed.
    Io(std::io::Error),

    /// Failed to install a filesystem watch.
    Watch(notify::Error),

    /// Invalid operation or state.
    InvalidOperation(String),

    /// A config file could not be parsed.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Normalize(err) => write!(f, "normalize error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Watch(err) => write!(f, "watch error: {}", err),
            Error::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
            Error::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Normalize(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Watch(err) => Some(err),
            Error::InvalidOperation(_) => None,
            Error::Config(_) => None,
        }
    }
}

impl From<sessionrelay_normalize::Error> for Error {
    fn from(err: sessionrelay_normalize::Error) -> Self {
        Error::Normalize(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err)
    }
}
