use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the filesystem-infrastructure layer.
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),
    /// No sessions root could be resolved (`CODEX_HOME` and `HOME` both unset)
    NoSessionsRoot,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::NoSessionsRoot => {
                write!(f, "could not resolve a sessions root: CODEX_HOME and HOME are both unset")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::NoSessionsRoot => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
