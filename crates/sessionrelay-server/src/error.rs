//! The error taxonomy from §7: an abstract kind plus a human-readable
//! message, with each kind mapping onto a specific response shape (an
//! error response, a status payload field, or a closed connection).

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    AgentAlreadyRunning,
    AgentNotRunning,
    InvalidPayload(String),
    InvalidCommand(String),
    PathOutsideRepo(String),
    FileNotFound(String),
    FileTooLarge { path: String, size: u64, limit: u64 },
    HubNotRunning,
    SubscriberClosed,
    RateLimited,
    Internal(String),
    Runtime(sessionrelay_runtime::Error),
    Index(sessionrelay_index::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AgentAlreadyRunning => write!(f, "an agent is already running for this client"),
            Error::AgentNotRunning => write!(f, "no agent is running for this client"),
            Error::InvalidPayload(msg) => write!(f, "invalid payload: {msg}"),
            Error::InvalidCommand(msg) => write!(f, "invalid command: {msg}"),
            Error::PathOutsideRepo(path) => write!(f, "path escapes the repo: {path}"),
            Error::FileNotFound(path) => write!(f, "file not found: {path}"),
            Error::FileTooLarge { path, size, limit } => {
                write!(f, "file too large: {path} is {size} bytes, limit is {limit}")
            }
            Error::HubNotRunning => write!(f, "event hub is not running"),
            Error::SubscriberClosed => write!(f, "subscriber channel is closed"),
            Error::RateLimited => write!(f, "inbound message rate exceeded"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
            Error::Runtime(err) => write!(f, "{err}"),
            Error::Index(err) => write!(f, "{err}"),
            Error::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Runtime(err) => Some(err),
            Error::Index(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sessionrelay_runtime::Error> for Error {
    fn from(err: sessionrelay_runtime::Error) -> Self {
        Error::Runtime(err)
    }
}

impl From<sessionrelay_index::Error> for Error {
    fn from(err: sessionrelay_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Numeric error code surfaced on the wire (§4.8). Kept separate from the
/// `Error` variant names so the wire representation doesn't change if the
/// variants are refactored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub i64);

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::AgentAlreadyRunning => ErrorCode(1001),
            Error::AgentNotRunning => ErrorCode(1002),
            Error::InvalidPayload(_) => ErrorCode(1003),
            Error::InvalidCommand(_) => ErrorCode(1004),
            Error::PathOutsideRepo(_) => ErrorCode(1005),
            Error::FileNotFound(_) => ErrorCode(1006),
            Error::FileTooLarge { .. } => ErrorCode(1007),
            Error::RateLimited => ErrorCode(1008),
            Error::HubNotRunning
            | Error::SubscriberClosed
            | Error::Internal(_)
            | Error::Runtime(_)
            | Error::Index(_)
            | Error::Io(_) => ErrorCode(1000),
        }
    }

    /// §7: `RateLimited` closes the connection with a policy-violation
    /// reason rather than sending an error response. `HubNotRunning` and
    /// `SubscriberClosed` are internal conditions that should never reach a
    /// client in practice, so treat them the same way if they ever do.
    pub fn closes_connection(&self) -> bool {
        matches!(self, Error::RateLimited | Error::HubNotRunning | Error::SubscriberClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_closes_the_connection() {
        assert!(Error::RateLimited.closes_connection());
        assert!(!Error::AgentNotRunning.closes_connection());
    }
}
