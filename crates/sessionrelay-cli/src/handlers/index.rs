use anyhow::Result;
use owo_colors::OwoColorize;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;

pub fn handle(ctx: &ExecutionContext, format: OutputFormat) -> Result<()> {
    ctx.index().refresh()?;
    let sessions = ctx.index().get_all_sessions()?;
    let projects = ctx.index().list_projects()?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "sessions_root": ctx.sessions_root().display().to_string(),
                    "session_count": sessions.len(),
                    "project_count": projects.len(),
                })
            );
        }
        OutputFormat::Plain => {
            println!(
                "indexed {} under {}",
                format!("{} session(s) across {} project(s)", sessions.len(), projects.len()).green(),
                ctx.sessions_root().display(),
            );
        }
    }
    Ok(())
}
