//! Per-file metadata extraction for the index cache: re-parses a session
//! file's head (up to a line cap) to rebuild its `SessionIndexEntry` (§4.3).

use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use sessionrelay_core::LineReader;
use sessionrelay_normalize::normalize_parsed;
use sessionrelay_normalize::schema::LogLine;
use sessionrelay_types::{collapse_and_truncate, ContentBlock, Role, SessionIndexEntry};

use crate::error::Result;

const SUMMARY_MAX_CHARS: usize = 200;

#[derive(Default)]
struct HeadState {
    session_id: Option<String>,
    project_path: Option<String>,
    git_branch: Option<String>,
    git_commit: Option<String>,
    git_repo: Option<String>,
    model_provider: Option<String>,
    model: Option<String>,
    cli_version: Option<String>,
    earliest: Option<DateTime<Utc>>,
    latest: Option<DateTime<Utc>>,
    first_prompt: Option<String>,
    last_assistant_text: Option<String>,
    message_count: u64,
}

pub fn parse_head(path: &Path, mtime_ms: i64, file_size: u64, line_limit: usize) -> Result<SessionIndexEntry> {
    let file = std::fs::File::open(path)?;
    let reader = LineReader::new(BufReader::new(file));
    let mut state = HeadState::default();
    let mut line_count: u64 = 0;

    for (index, line) in reader.enumerate() {
        if index >= line_limit {
            break;
        }
        let line = line?;
        line_count += 1;
        if line.too_long {
            continue;
        }
        let trimmed = line.data.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(log_line) = serde_json::from_str::<LogLine>(trimmed) else {
            continue;
        };
        apply_envelope_timestamp(&mut state, &log_line);
        apply_envelope_metadata(&mut state, &log_line);
        if let Some(item) = normalize_parsed(log_line, index as u64 + 1) {
            apply_conversation_item(&mut state, &item);
        }
    }

    let fallback_time = || DateTime::from_timestamp_millis(mtime_ms).unwrap_or_else(Utc::now);
    let session_id = state.session_id.unwrap_or_default();
    let project_path = state.project_path.unwrap_or_default();

    Ok(SessionIndexEntry {
        session_id,
        full_path: path.to_string_lossy().into_owned(),
        file_mtime_ms: mtime_ms,
        file_size,
        line_count,
        first_prompt: state.first_prompt.unwrap_or_default(),
        summary: state.last_assistant_text.unwrap_or_default(),
        message_count: state.message_count,
        created: state.earliest.unwrap_or_else(fallback_time),
        modified: state.latest.unwrap_or_else(fallback_time),
        project_path,
        git_branch: state.git_branch,
        git_commit: state.git_commit,
        git_repo: state.git_repo,
        model_provider: state.model_provider,
        model: state.model,
        cli_version: state.cli_version,
    })
}

fn apply_envelope_timestamp(state: &mut HeadState, log_line: &LogLine) {
    let raw = match log_line {
        LogLine::SessionMeta(r) => &r.timestamp,
        LogLine::TurnContext(r) => &r.timestamp,
        LogLine::ResponseItem(r) => &r.timestamp,
        LogLine::EventMsg(r) => &r.timestamp,
        LogLine::Unknown => return,
    };
    let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
        return;
    };
    let parsed = parsed.with_timezone(&Utc);
    state.earliest = Some(state.earliest.map_or(parsed, |e| e.min(parsed)));
    state.latest = Some(state.latest.map_or(parsed, |l| l.max(parsed)));
}

fn apply_envelope_metadata(state: &mut HeadState, log_line: &LogLine) {
    match log_line {
        LogLine::SessionMeta(record) => {
            state.session_id = Some(record.payload.id.clone());
            state.project_path = Some(record.payload.cwd.clone());
            state.cli_version = Some(record.payload.cli_version.clone());
            state.model_provider = record.payload.model_provider.clone();
            if let Some(git) = &record.payload.git {
                state.git_branch = git.branch.clone();
                state.git_commit = git.commit_hash.clone();
                state.git_repo = git.repository_url.clone();
            }
        }
        LogLine::TurnContext(record) => {
            state.project_path = Some(record.payload.cwd.clone());
            state.model = Some(record.payload.model.clone());
        }
        _ => {}
    }
}

fn apply_conversation_item(state: &mut HeadState, item: &sessionrelay_types::ConversationItem) {
    if item.role != Role::User {
        if let Some(text) = sole_text(item) {
            state.last_assistant_text = Some(text);
        }
        return;
    }
    state.message_count += 1;
    if state.first_prompt.is_none() {
        state.first_prompt = sole_text(item);
    }
}

fn sole_text(item: &sessionrelay_types::ConversationItem) -> Option<String> {
    let joined = item
        .content
        .iter()
        .filter_map(ContentBlock::as_plain_text)
        .collect::<Vec<_>>()
        .join("\n");
    if joined.is_empty() {
        None
    } else {
        Some(collapse_and_truncate(&joined, SUMMARY_MAX_CHARS))
    }
}
