use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable that overrides the sessions root (§6).
pub const SESSIONS_ROOT_ENV: &str = "CODEX_HOME";

/// Resolves the sessions root: `CODEX_HOME` if set, else `$HOME/.codex/sessions`.
///
/// Returns `None` only when `CODEX_HOME` is unset and `HOME` is also unset,
/// which leaves no well-defined default.
pub fn resolve_sessions_root() -> Option<PathBuf> {
    if let Ok(override_path) = std::env::var(SESSIONS_ROOT_ENV) {
        return Some(PathBuf::from(override_path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".codex").join("sessions"))
}

/// Like [`resolve_sessions_root`] but fails with [`Error::NoSessionsRoot`]
/// instead of returning `None`, for callers that cannot proceed without one.
pub fn require_sessions_root() -> Result<PathBuf> {
    resolve_sessions_root().ok_or(Error::NoSessionsRoot)
}

/// Filename pattern the walker treats as a session file (§4.3, §6):
/// `rollout-*.jsonl`, extension compared case-insensitively.
pub fn is_session_file_name(name: &str) -> bool {
    if !name.starts_with("rollout-") {
        return false;
    }
    let Some(dot) = name.rfind('.') else {
        return false;
    };
    name[dot + 1..].eq_ignore_ascii_case("jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_rollout_jsonl_case_insensitively() {
        assert!(is_session_file_name("rollout-2026-01-31.jsonl"));
        assert!(is_session_file_name("rollout-2026-01-31.JSONL"));
        assert!(!is_session_file_name("other-2026-01-31.jsonl"));
        assert!(!is_session_file_name("rollout-2026-01-31.json"));
        assert!(!is_session_file_name("rollout-no-extension"));
    }

    #[test]
    fn env_override_takes_precedence() {
        unsafe {
            std::env::set_var(SESSIONS_ROOT_ENV, "/tmp/custom-sessions");
        }
        assert_eq!(
            resolve_sessions_root(),
            Some(PathBuf::from("/tmp/custom-sessions"))
        );
        unsafe {
            std::env::remove_var(SESSIONS_ROOT_ENV);
        }
    }
}
