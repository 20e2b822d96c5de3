//! In-memory session index and cache (C3). Not SQLite-backed: the cache is
//! ephemeral and rebuilt from the on-disk session logs on every refresh.

mod cache;
mod error;
mod head;

pub use cache::{IndexCache, ProjectIndex};
pub use error::{Error, Result};
