use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the index layer.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    NoSessionsRoot,
    /// A session-id prefix lookup matched more than one session.
    AmbiguousSessionId(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "index IO error: {}", err),
            Error::NoSessionsRoot => write!(f, "no sessions root configured"),
            Error::AmbiguousSessionId(prefix) => {
                write!(f, "ambiguous session id prefix '{}': multiple sessions match", prefix)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::NoSessionsRoot | Error::AmbiguousSessionId(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<sessionrelay_core::Error> for Error {
    fn from(err: sessionrelay_core::Error) -> Self {
        match err {
            sessionrelay_core::Error::Io(io) => Error::Io(io),
            sessionrelay_core::Error::NoSessionsRoot => Error::NoSessionsRoot,
        }
    }
}
