//! Session streaming, event hub, filtered subscription, and client focus
//! tracking (C4-C7): the live half of sessionrelay, as opposed to the
//! on-disk indexer (`sessionrelay-index`).

mod config;
mod error;
mod hub;
mod registry;
mod streamer;
mod subscriber;
mod watcher;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use hub::{EventHub, Subscriber, SubscriberId};
pub use registry::ClientRegistry;
pub use streamer::{SessionStreamer, StreamerHandle};
pub use subscriber::{FilteredSubscriber, Focus};
pub use watcher::{FileWatch, WatchSignal};
