use anyhow::Result;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;

pub fn handle(ctx: &ExecutionContext, project: Option<String>, format: OutputFormat) -> Result<()> {
    let sessions = match &project {
        Some(project_path) => ctx.index().get_sessions_for_project(project_path)?,
        None => ctx.index().get_all_sessions()?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&sessions)?),
        OutputFormat::Plain => {
            if sessions.is_empty() {
                println!("no sessions found");
                return Ok(());
            }
            for session in &sessions {
                println!(
                    "{}  {}  {} msg(s)  {}",
                    &session.session_id[..session.session_id.len().min(12)],
                    session.modified.to_rfc3339(),
                    session.message_count,
                    session.first_prompt,
                );
            }
        }
    }
    Ok(())
}
