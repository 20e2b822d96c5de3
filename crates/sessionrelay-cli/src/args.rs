use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Parser)]
#[command(name = "sessionrelay")]
#[command(about = "Index session logs and run the event-distribution server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Overrides the sessions root; defaults to CODEX_HOME or ~/.codex/sessions.
    #[arg(long, global = true)]
    pub sessions_root: Option<PathBuf>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walks the sessions root and rebuilds the index once.
    Index,
    /// Lists known projects, most recently active first.
    Projects,
    /// Lists sessions, optionally scoped to one project.
    Sessions {
        #[arg(long)]
        project: Option<String>,
    },
    /// Runs the event-distribution server over stdio.
    Serve {
        /// The workspace id every connecting client is auto-subscribed to.
        #[arg(long, default_value = "default")]
        workspace_id: String,
        /// The directory `status/get` and `file/get` resolve against; defaults to the current directory.
        #[arg(long)]
        workspace_root: Option<PathBuf>,
        #[arg(long)]
        rate_limit_per_minute: Option<u32>,
    },
}
