use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use sessionrelay_index::IndexCache;

/// Resolves the sessions root and opens the session index once, up front,
/// for reuse across a single CLI invocation.
pub struct ExecutionContext {
    sessions_root: PathBuf,
    index: Arc<IndexCache>,
}

impl ExecutionContext {
    pub fn new(sessions_root_override: Option<PathBuf>) -> Result<Self> {
        let sessions_root = match sessions_root_override {
            Some(path) => path,
            None => sessionrelay_core::require_sessions_root()
                .context("could not resolve a sessions root; set CODEX_HOME or pass --sessions-root")?,
        };
        let index = Arc::new(IndexCache::new(sessions_root.clone()));
        Ok(ExecutionContext { sessions_root, index })
    }

    pub fn sessions_root(&self) -> &std::path::Path {
        &self.sessions_root
    }

    pub fn index(&self) -> &Arc<IndexCache> {
        &self.index
    }
}
