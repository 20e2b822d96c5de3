use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;

pub fn handle(ctx: &ExecutionContext, format: OutputFormat) -> Result<()> {
    let projects = ctx.index().list_projects()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&projects)?),
        OutputFormat::Plain => {
            if projects.is_empty() {
                println!("no projects found under {}", ctx.sessions_root().display());
                return Ok(());
            }
            for project in &projects {
                println!(
                    "{:<8} {:>5} session(s)  last active {}  {}",
                    project.git_branch.as_deref().unwrap_or("-"),
                    project.session_count,
                    project.most_recent_activity.to_rfc3339(),
                    project.project_path,
                );
            }
        }
    }
    Ok(())
}
