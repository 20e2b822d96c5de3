use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use sessionrelay_runtime::RuntimeConfig;
use sessionrelay_server::{FilesystemFileFetcher, NullAgentRunner, Server};

use crate::context::ExecutionContext;

pub async fn handle(
    ctx: &ExecutionContext,
    workspace_id: String,
    workspace_root: Option<PathBuf>,
    rate_limit_per_minute: Option<u32>,
) -> Result<()> {
    let workspace_root = workspace_root.unwrap_or(std::env::current_dir()?);
    let file_fetcher = Arc::new(FilesystemFileFetcher::new(workspace_root.clone()));

    let mut config = RuntimeConfig::load()?;
    if let Some(limit) = rate_limit_per_minute {
        config.rate_limit_per_minute = limit;
    }

    let server = Server::with_config(
        workspace_id,
        workspace_root,
        ctx.sessions_root().to_path_buf(),
        Arc::new(NullAgentRunner),
        file_fetcher,
        config,
    );

    eprintln!("sessionrelay: serving on stdio, sessions root {}", ctx.sessions_root().display());
    sessionrelay_server::serve_stdio(Arc::new(server)).await;
    Ok(())
}
