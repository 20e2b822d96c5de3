//! The external "agent runner" collaborator (§6): the core tells it to
//! start or stop an agent and forwards tool-permission responses to it; the
//! runner itself, and any actual process lifecycle, live outside this
//! crate (§D non-goals).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    New,
    Continue,
}

pub trait AgentRunner: Send + Sync {
    /// Starts (or continues) an agent run and returns the session id the
    /// streamer will pick up log lines for.
    fn run(&self, prompt: &str, mode: RunMode, session_id: Option<&str>) -> crate::error::Result<String>;

    fn stop(&self, session_id: &str) -> crate::error::Result<()>;

    fn respond(&self, tool_use_id: &str, response: &str, is_error: bool) -> crate::error::Result<()>;
}

/// An `AgentRunner` that rejects every `agent/*` command with
/// `Error::Internal`. For deployments that only need `status/get`,
/// `file/get`, and `session/watch` against logs some other process writes.
pub struct NullAgentRunner;

impl AgentRunner for NullAgentRunner {
    fn run(&self, _prompt: &str, _mode: RunMode, _session_id: Option<&str>) -> crate::error::Result<String> {
        Err(crate::error::Error::Internal("no agent runner is configured".to_string()))
    }

    fn stop(&self, _session_id: &str) -> crate::error::Result<()> {
        Err(crate::error::Error::Internal("no agent runner is configured".to_string()))
    }

    fn respond(&self, _tool_use_id: &str, _response: &str, _is_error: bool) -> crate::error::Result<()> {
        Err(crate::error::Error::Internal("no agent runner is configured".to_string()))
    }
}
