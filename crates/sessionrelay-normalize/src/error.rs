use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while normalizing a session log line.
///
/// Per the normalizer's contract, only malformed *envelope* JSON is an
/// error; malformed sub-payloads are silently skipped (see `normalize_line`).
#[derive(Debug)]
pub enum Error {
    /// The outer JSON envelope (`timestamp`/`type`/`payload`) could not be parsed.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "malformed session log line: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
