//! Testing infrastructure shared across sessionrelay crates.
//!
//! - `fixtures`: writes `rollout-*.jsonl` session log fixtures to a temp dir
//! - `recording`: a `Subscriber` that records every event it receives, for
//!   asserting on hub/filter behavior without a real client connection
//! - `process`: background process management for exercising the CLI's
//!   `serve` subcommand end to end

pub mod fixtures;
pub mod process;
pub mod recording;

pub use fixtures::SessionFileBuilder;
pub use recording::RecordingSubscriber;
