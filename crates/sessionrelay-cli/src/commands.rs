use anyhow::Result;

use crate::args::{Cli, Commands};
use crate::context::ExecutionContext;
use crate::handlers;

pub fn run(cli: Cli) -> Result<()> {
    let ctx = ExecutionContext::new(cli.sessions_root.clone())?;

    match cli.command {
        Commands::Index => handlers::index::handle(&ctx, cli.format),
        Commands::Projects => handlers::projects::handle(&ctx, cli.format),
        Commands::Sessions { project } => handlers::sessions::handle(&ctx, project, cli.format),
        Commands::Serve { workspace_id, workspace_root, rate_limit_per_minute } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(handlers::serve::handle(&ctx, workspace_id, workspace_root, rate_limit_per_minute))
        }
    }
}
