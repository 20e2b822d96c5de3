//! Newline-delimited JSON request/response server over the event hub.
//!
//! This crate owns the wire protocol (§4.8), the closed command surface
//! (`agent/*`, `status/get`, `file/get`, `session/watch`, `session/focus`,
//! ...), and per-connection plumbing — `sessionrelay-runtime` owns the hub,
//! filtering, and streaming that this server sits on top of.

pub mod agent;
pub mod commands;
pub mod connection;
pub mod error;
pub mod file_fetch;
pub mod notify;
pub mod rate_limit;
pub mod server;
pub mod session_watch;
pub mod status;
pub mod wire;

pub use agent::{AgentRunner, NullAgentRunner, RunMode};
pub use connection::{ClientSink, ConnectionState};
pub use error::{Error, Result};
pub use file_fetch::{Encoding, FileContents, FileFetcher, FilesystemFileFetcher};
pub use server::{serve_stdio, Server};
pub use session_watch::SessionWatchRegistry;
pub use wire::{Notification, OutboundMessage, Request, RequestId, Response};
