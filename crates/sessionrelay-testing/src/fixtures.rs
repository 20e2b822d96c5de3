//! Builds `rollout-*.jsonl` session log fixtures on disk, in the envelope
//! shape the normalizer and indexer both parse (§3): one `session_meta`
//! line followed by `response_item` lines.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};

pub struct SessionFileBuilder {
    session_id: String,
    cwd: String,
    originator: String,
    cli_version: String,
    model_provider: Option<String>,
    git: Option<GitFixture>,
    lines: Vec<String>,
    next_timestamp: DateTime<Utc>,
}

struct GitFixture {
    branch: Option<String>,
    commit: Option<String>,
    repository_url: Option<String>,
}

impl SessionFileBuilder {
    pub fn new(session_id: impl Into<String>, cwd: impl Into<String>) -> Self {
        SessionFileBuilder {
            session_id: session_id.into(),
            cwd: cwd.into(),
            originator: "codex".to_string(),
            cli_version: "1.0.0".to_string(),
            model_provider: None,
            git: None,
            lines: Vec::new(),
            next_timestamp: DateTime::from_timestamp(1_770_000_000, 0).unwrap_or_else(Utc::now),
        }
    }

    pub fn with_model_provider(mut self, provider: impl Into<String>) -> Self {
        self.model_provider = Some(provider.into());
        self
    }

    pub fn with_git(
        mut self,
        branch: impl Into<String>,
        commit: impl Into<String>,
        repository_url: impl Into<String>,
    ) -> Self {
        self.git = Some(GitFixture {
            branch: Some(branch.into()),
            commit: Some(commit.into()),
            repository_url: Some(repository_url.into()),
        });
        self
    }

    pub fn user_message(mut self, text: &str) -> Self {
        let ts = self.advance_timestamp();
        self.lines.push(format!(
            r#"{{"timestamp":"{ts}","type":"response_item","payload":{{"type":"message","role":"user","content":[{{"type":"input_text","text":{text}}}]}}}}"#,
            ts = ts.to_rfc3339(),
            text = serde_json::to_string(text).expect("string always serializes"),
        ));
        self
    }

    pub fn assistant_message(mut self, text: &str) -> Self {
        let ts = self.advance_timestamp();
        self.lines.push(format!(
            r#"{{"timestamp":"{ts}","type":"response_item","payload":{{"type":"message","role":"assistant","content":[{{"type":"output_text","text":{text}}}]}}}}"#,
            ts = ts.to_rfc3339(),
            text = serde_json::to_string(text).expect("string always serializes"),
        ));
        self
    }

    pub fn tool_call(mut self, call_id: &str, name: &str, arguments: &str) -> Self {
        let ts = self.advance_timestamp();
        self.lines.push(format!(
            r#"{{"timestamp":"{ts}","type":"response_item","payload":{{"type":"function_call","name":"{name}","arguments":{arguments},"call_id":"{call_id}"}}}}"#,
            ts = ts.to_rfc3339(),
            arguments = serde_json::to_string(arguments).expect("string always serializes"),
        ));
        self
    }

    fn advance_timestamp(&mut self) -> DateTime<Utc> {
        let current = self.next_timestamp;
        self.next_timestamp += chrono::Duration::seconds(1);
        current
    }

    fn session_meta_line(&self) -> String {
        let git = self.git.as_ref().map(|g| {
            serde_json::json!({
                "branch": g.branch,
                "commit_hash": g.commit,
                "repository_url": g.repository_url,
            })
        });
        serde_json::json!({
            "timestamp": self.next_timestamp.to_rfc3339(),
            "type": "session_meta",
            "payload": {
                "id": self.session_id,
                "cwd": self.cwd,
                "originator": self.originator,
                "cli_version": self.cli_version,
                "model_provider": self.model_provider,
                "git": git,
            }
        })
        .to_string()
    }

    /// Writes the fixture to `dir/rollout-<session_id>.jsonl` and returns its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("rollout-{}.jsonl", self.session_id));
        let mut body = self.session_meta_line();
        body.push('\n');
        for line in &self.lines {
            body.push_str(line);
            body.push('\n');
        }
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_session_meta_line_followed_by_response_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = SessionFileBuilder::new("sess1", "/repo/a")
            .with_model_provider("openai")
            .user_message("hello")
            .assistant_message("hi there")
            .write_to(dir.path())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(r#""type":"session_meta""#));
        assert!(lines[1].contains(r#""role":"user""#));
        assert!(lines[2].contains(r#""role":"assistant""#));
    }
}
