use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-file metadata produced by the indexer (C3) from a session file's head.
///
/// Readers receive deep copies; the cache retains ownership of the
/// authoritative entry (§3 "Ownership and lifecycle").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionIndexEntry {
    pub session_id: String,
    pub full_path: String,
    pub file_mtime_ms: i64,
    pub file_size: u64,
    pub line_count: u64,
    /// Truncated to 200 chars with whitespace collapsed; see `util::collapse_and_truncate`.
    pub first_prompt: String,
    /// Last assistant message or agent summary, same truncation rule as `first_prompt`.
    pub summary: String,
    /// User messages only.
    pub message_count: u64,
    /// Earliest log timestamp, or the file's mtime if no line carried one.
    pub created: DateTime<Utc>,
    /// Latest log timestamp, or the file's mtime if no line carried one.
    pub modified: DateTime<Utc>,
    pub project_path: String,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub git_repo: Option<String>,
    pub model_provider: Option<String>,
    pub model: Option<String>,
    pub cli_version: Option<String>,
}

/// Aggregate over every `SessionIndexEntry` sharing a `project_path`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub project_path: String,
    pub session_count: u64,
    pub total_bytes: u64,
    pub most_recent_activity: DateTime<Utc>,
    /// Git fields carried from the most recently modified session in the group.
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub git_repo: Option<String>,
}

impl ProjectSummary {
    /// Folds one group of entries, already sorted by `modified` descending,
    /// into its aggregate. Returns `None` for an empty group.
    pub fn from_sorted_entries(project_path: &str, entries: &[SessionIndexEntry]) -> Option<Self> {
        let newest = entries.first()?;
        Some(ProjectSummary {
            project_path: project_path.to_string(),
            session_count: entries.len() as u64,
            total_bytes: entries.iter().map(|e| e.file_size).sum(),
            most_recent_activity: newest.modified,
            git_branch: newest.git_branch.clone(),
            git_commit: newest.git_commit.clone(),
            git_repo: newest.git_repo.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, modified_secs: i64, size: u64) -> SessionIndexEntry {
        SessionIndexEntry {
            session_id: "sess".into(),
            full_path: format!("/sessions/{path}"),
            file_mtime_ms: modified_secs * 1000,
            file_size: size,
            line_count: 10,
            first_prompt: "hi".into(),
            summary: "done".into(),
            message_count: 1,
            created: DateTime::from_timestamp(modified_secs - 10, 0).unwrap(),
            modified: DateTime::from_timestamp(modified_secs, 0).unwrap(),
            project_path: "/repo".into(),
            git_branch: Some("main".into()),
            git_commit: Some("abc123".into()),
            git_repo: Some("git@example.com:repo.git".into()),
            model_provider: Some("openai".into()),
            model: Some("gpt-5".into()),
            cli_version: Some("1.0.0".into()),
        }
    }

    #[test]
    fn aggregates_bytes_and_count_and_picks_newest_git_fields() {
        let newest = entry("b.jsonl", 200, 30);
        let older = entry("a.jsonl", 100, 20);
        let summary = ProjectSummary::from_sorted_entries("/repo", &[newest.clone(), older]).unwrap();
        assert_eq!(summary.session_count, 2);
        assert_eq!(summary.total_bytes, 50);
        assert_eq!(summary.most_recent_activity, newest.modified);
        assert_eq!(summary.git_branch.as_deref(), Some("main"));
    }

    #[test]
    fn empty_group_yields_none() {
        assert!(ProjectSummary::from_sorted_entries("/repo", &[]).is_none());
    }
}
