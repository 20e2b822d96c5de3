//! The session normalizer (C2): turns one session-log line into zero or one
//! [`ConversationItem`]. See the line-shape table in the module-level
//! commentary of `schema.rs` for the exhaustive behavior this implements.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sessionrelay_types::{ContentBlock, ConversationItem, Role};

use crate::error::Result;
use crate::schema::{
    ContextCompactedPayload, EventMsgPayload, EventMsgRecord, LogLine, MessageContentBlock,
    MessageContentField, ResponseItemPayload, ResponseItemRecord, SummaryText,
};

static TURN_ABORTED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<turn_aborted>(.*?)</turn_aborted>").unwrap());

static USER_SHELL_COMMAND_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<user_shell_command><command>(.*?)</command><result>(.*?)</result></user_shell_command>")
        .unwrap()
});

const TURN_ABORTED_FALLBACK: &str = "The previous turn was interrupted.";
const CONTEXT_COMPACTED_FALLBACK: &str = "Conversation compacted to continue this session.";

/// Parses one whitespace-trimmed JSON-line string into zero or one
/// normalized item. Only malformed outer-envelope JSON is an error; a
/// malformed sub-payload is treated as "no item" (§4.2 contract).
///
/// Parsed in two stages: the line is first read as a generic JSON value,
/// which is where non-JSON input fails. The value is then deserialized
/// into `LogLine` separately; a record whose `type` tag matches but whose
/// `payload` doesn't fit that record's shape fails only this second stage,
/// since `serde`'s tagged-enum deserialization commits to a variant as
/// soon as the tag matches, and a single combined parse can't tell the two
/// failure modes apart.
pub fn normalize_line(raw: &str, line_number: u64) -> Result<Option<ConversationItem>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let envelope: serde_json::Value = serde_json::from_str(trimmed)?;
    let log_line: LogLine = match serde_json::from_value(envelope) {
        Ok(log_line) => log_line,
        Err(_) => return Ok(None),
    };
    Ok(normalize_parsed(log_line, line_number))
}

/// Same as [`normalize_line`] but for an already-parsed envelope, so callers
/// that need the raw `session_meta`/`turn_context` fields too (the indexer,
/// C3) don't have to parse the line twice.
pub fn normalize_parsed(log_line: LogLine, line_number: u64) -> Option<ConversationItem> {
    match log_line {
        LogLine::ResponseItem(record) => normalize_response_item(record, line_number),
        LogLine::EventMsg(record) => normalize_event_msg(record, line_number),
        // session_meta/turn_context never produce a conversation item; the
        // indexer (C3) reads them directly for metadata.
        LogLine::SessionMeta(_) | LogLine::TurnContext(_) | LogLine::Unknown => None,
    }
}

fn normalize_response_item(record: ResponseItemRecord, line_number: u64) -> Option<ConversationItem> {
    let timestamp = parse_timestamp(&record.timestamp);
    match record.payload {
        ResponseItemPayload::Message(message) => {
            let role = match message.role.as_str() {
                "user" => Role::User,
                "assistant" => Role::Assistant,
                _ => return None,
            };
            let blocks = message_content_to_blocks(&message.content);
            if blocks.is_empty() {
                return None;
            }
            if role == Role::User {
                if all_blocks_are_bootstrap(&blocks) {
                    return None;
                }
                if let Some(item) = try_turn_aborted_override(&blocks, line_number, timestamp) {
                    return Some(item);
                }
                let rewritten = rewrite_shell_command_blocks(blocks);
                return Some(build_item(line_number, timestamp, Role::User, rewritten, false, false));
            }
            Some(build_item(line_number, timestamp, Role::Assistant, blocks, false, false))
        }
        ResponseItemPayload::FunctionCall(call) => {
            if call.name.is_empty() || call.call_id.is_empty() {
                return None;
            }
            let mut args = parse_function_call_arguments(&call.arguments);
            apply_exec_command_alias(&call.name, &mut args);
            compact_view_image_paths(&call.name, &mut args);
            let block = ContentBlock::ToolUse {
                tool_name: call.name,
                tool_id: call.call_id,
                tool_input: args,
            };
            Some(build_item(line_number, timestamp, Role::Assistant, vec![block], false, false))
        }
        ResponseItemPayload::FunctionCallOutput(output) => {
            if output.call_id.is_empty() || output.output.is_empty() {
                return None;
            }
            let (content, exit_code) = unwrap_tool_output(&output.output);
            let is_error = derive_is_error(&content, exit_code);
            let block = ContentBlock::ToolResult {
                tool_use_id: output.call_id,
                content,
                is_error,
            };
            Some(build_item(line_number, timestamp, Role::Assistant, vec![block], false, false))
        }
        ResponseItemPayload::CustomToolCall(call) => {
            if call.name.is_empty() || call.call_id.is_empty() {
                return None;
            }
            let mut args = parse_custom_tool_call_input(&call.input);
            apply_exec_command_alias(&call.name, &mut args);
            compact_view_image_paths(&call.name, &mut args);
            let block = ContentBlock::ToolUse {
                tool_name: call.name,
                tool_id: call.call_id,
                tool_input: args,
            };
            Some(build_item(line_number, timestamp, Role::Assistant, vec![block], false, false))
        }
        ResponseItemPayload::CustomToolCallOutput(output) => {
            if output.call_id.is_empty() || output.output.is_empty() {
                return None;
            }
            let (content, exit_code) = unwrap_tool_output(&output.output);
            let is_error = derive_is_error(&content, exit_code);
            let block = ContentBlock::ToolResult {
                tool_use_id: output.call_id,
                content,
                is_error,
            };
            Some(build_item(line_number, timestamp, Role::Assistant, vec![block], false, false))
        }
        ResponseItemPayload::Reasoning(reasoning) => {
            if reasoning.summary.is_empty() {
                return None;
            }
            let text = reasoning
                .summary
                .iter()
                .filter_map(|s| match s {
                    SummaryText::SummaryText { text } => Some(text.as_str()),
                    SummaryText::Unknown => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                return None;
            }
            Some(build_item(
                line_number,
                timestamp,
                Role::Assistant,
                vec![ContentBlock::thinking(text)],
                false,
                false,
            ))
        }
        ResponseItemPayload::Unknown => None,
    }
}

fn normalize_event_msg(record: EventMsgRecord, line_number: u64) -> Option<ConversationItem> {
    let timestamp = parse_timestamp(&record.timestamp);
    match record.payload {
        EventMsgPayload::ContextCompacted(payload) => {
            let body = compaction_body(&payload);
            Some(build_item(
                line_number,
                timestamp,
                Role::User,
                vec![ContentBlock::text(body)],
                true,
                false,
            ))
        }
        // agent_reasoning duplicates response_item.reasoning; turn_aborted's
        // body is carried by the accompanying response_item.message; every
        // other sub-discriminator (agent_message, user_message, token_count,
        // anything unrecognized) is ignored (§3, §4.2).
        EventMsgPayload::UserMessage(_)
        | EventMsgPayload::AgentMessage(_)
        | EventMsgPayload::AgentReasoning(_)
        | EventMsgPayload::TurnAborted(_)
        | EventMsgPayload::Unknown => None,
    }
}

fn compaction_body(payload: &ContextCompactedPayload) -> String {
    [&payload.user_summary, &payload.summary, &payload.message]
        .into_iter()
        .find_map(|candidate| candidate.as_ref().filter(|s| !s.trim().is_empty()).cloned())
        .unwrap_or_else(|| CONTEXT_COMPACTED_FALLBACK.to_string())
}

fn build_item(
    line: u64,
    timestamp: DateTime<Utc>,
    role: Role,
    content: Vec<ContentBlock>,
    is_context_compaction: bool,
    is_turn_aborted: bool,
) -> ConversationItem {
    ConversationItem {
        line,
        timestamp,
        role,
        is_context_compaction,
        is_turn_aborted,
        content,
    }
}

fn message_content_to_blocks(content: &MessageContentField) -> Vec<ContentBlock> {
    match content {
        MessageContentField::Plain(text) => {
            if text.is_empty() {
                vec![]
            } else {
                vec![ContentBlock::text(text.clone())]
            }
        }
        MessageContentField::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                MessageContentBlock::InputText { text } | MessageContentBlock::OutputText { text } => {
                    if text.is_empty() {
                        None
                    } else {
                        Some(ContentBlock::text(text.clone()))
                    }
                }
                MessageContentBlock::Unknown => None,
            })
            .collect(),
    }
}

fn all_blocks_are_bootstrap(blocks: &[ContentBlock]) -> bool {
    !blocks.is_empty()
        && blocks
            .iter()
            .all(|b| b.as_plain_text().is_some_and(is_bootstrap_text))
}

fn is_bootstrap_text(text: &str) -> bool {
    (text.starts_with("# AGENTS.md instructions for ") && text.contains("<INSTRUCTIONS>"))
        || (text.contains("<environment_context>")
            && text.contains("<cwd>")
            && text.contains("</environment_context>"))
}

fn try_turn_aborted_override(
    blocks: &[ContentBlock],
    line: u64,
    timestamp: DateTime<Utc>,
) -> Option<ConversationItem> {
    let text = blocks.iter().find_map(|b| b.as_plain_text())?;
    let captures = TURN_ABORTED_TAG.captures(text)?;
    let body = captures[1].trim();
    let body = if body.is_empty() { TURN_ABORTED_FALLBACK } else { body };
    Some(build_item(
        line,
        timestamp,
        Role::User,
        vec![ContentBlock::text(body)],
        false,
        true,
    ))
}

fn rewrite_shell_command_blocks(blocks: Vec<ContentBlock>) -> Vec<ContentBlock> {
    blocks
        .into_iter()
        .map(|block| match &block {
            ContentBlock::Text { text } => {
                if let Some(captures) = USER_SHELL_COMMAND_TAG.captures(text) {
                    ContentBlock::text(format_user_shell_command(&captures[1], &captures[2]))
                } else {
                    block
                }
            }
            _ => block,
        })
        .collect()
}

fn format_user_shell_command(command: &str, result: &str) -> String {
    let (content, exit_code) = unwrap_tool_output(result);
    let mut out = format!("You ran {command}");
    if let Some(code) = exit_code {
        out.push_str(&format!("\n    (exit {code})"));
    }
    for line in content.lines() {
        out.push_str("\n    ");
        out.push_str(line);
    }
    out
}

/// Unwraps the `{"output": "...", "metadata": {"exit_code": N}}` envelope a
/// tool output may carry (§3, §4.2). Returns the original text unchanged if
/// it isn't that shape.
fn unwrap_tool_output(raw: &str) -> (String, Option<i64>) {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return (raw.to_string(), None);
    };
    let Some(serde_json::Value::String(output)) = map.get("output") else {
        return (raw.to_string(), None);
    };
    let exit_code = map
        .get("metadata")
        .and_then(|m| m.get("exit_code"))
        .and_then(serde_json::Value::as_i64);
    (output.clone(), exit_code)
}

const EXIT_MARKERS: [&str; 2] = ["process exited with code", "exit code:"];

fn derive_is_error(content: &str, exit_code: Option<i64>) -> bool {
    if let Some(code) = exit_code {
        return code != 0;
    }
    let lower = content.to_lowercase();
    for marker in EXIT_MARKERS {
        if let Some(idx) = lower.find(marker) {
            let after = &content[idx + marker.len()..];
            if let Some(code) = leading_number(after) {
                return code != 0;
            }
        }
    }
    false
}

fn leading_number(text: &str) -> Option<i64> {
    let digits: String = text
        .trim_start()
        .trim_start_matches(':')
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_function_call_arguments(raw: &str) -> serde_json::Map<String, serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => {
            let mut map = serde_json::Map::new();
            map.insert("arguments".to_string(), serde_json::Value::String(raw.to_string()));
            map
        }
    }
}

fn parse_custom_tool_call_input(input: &serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match input {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::String(s) => {
            let mut map = serde_json::Map::new();
            map.insert("input".to_string(), serde_json::Value::String(s.clone()));
            map
        }
        other => {
            let mut map = serde_json::Map::new();
            map.insert("input".to_string(), other.clone());
            map
        }
    }
}

fn apply_exec_command_alias(tool_name: &str, args: &mut serde_json::Map<String, serde_json::Value>) {
    if tool_name == "exec_command"
        && let Some(cmd) = args.get("cmd").cloned()
    {
        args.entry("command".to_string()).or_insert(cmd);
    }
}

fn compact_view_image_paths(tool_name: &str, args: &mut serde_json::Map<String, serde_json::Value>) {
    if tool_name != "view_image" {
        return;
    }
    for value in args.values_mut() {
        if let serde_json::Value::String(s) = value {
            *s = compact_cdev_path(s);
        }
    }
}

/// Compacts an absolute workspace-local `/.../.cdev/...` path to `.cdev/...` (§4.2).
fn compact_cdev_path(path: &str) -> String {
    const MARKER: &str = "/.cdev/";
    match path.find(MARKER) {
        Some(idx) => format!(".cdev/{}", &path[idx + MARKER.len()..]),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_with_text_block() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"hi"}]}}"#;
        let item = normalize_line(line, 1).unwrap().unwrap();
        assert_eq!(item.role, Role::User);
        assert!(!item.is_context_compaction);
        assert!(!item.is_turn_aborted);
        assert_eq!(item.content, vec![ContentBlock::text("hi")]);
    }

    #[test]
    fn developer_role_is_dropped() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"message","role":"developer","content":[{"type":"input_text","text":"ignored"}]}}"#;
        assert!(normalize_line(line, 1).unwrap().is_none());
    }

    #[test]
    fn function_call_alias_adds_command_key() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"function_call","name":"exec_command","arguments":"{\"cmd\":\"ls -la\"}","call_id":"call_1"}}"#;
        let item = normalize_line(line, 2).unwrap().unwrap();
        match &item.content[0] {
            ContentBlock::ToolUse { tool_input, .. } => {
                assert_eq!(tool_input.get("cmd").unwrap(), "ls -la");
                assert_eq!(tool_input.get("command").unwrap(), "ls -la");
            }
            other => panic!("expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn wrapped_tool_output_unwraps_and_is_not_error() {
        let line = r#"{"timestamp":"2026-01-31T12:00:03Z","type":"response_item","payload":{"type":"custom_tool_call_output","call_id":"call_1","output":"{\"output\":\"Success.\\nA A.txt\\n\",\"metadata\":{\"exit_code\":0}}"}}"#;
        let item = normalize_line(line, 3).unwrap().unwrap();
        match &item.content[0] {
            ContentBlock::ToolResult { content, is_error, .. } => {
                assert_eq!(content, "Success.\nA A.txt\n");
                assert!(!is_error);
            }
            other => panic!("expected tool_result, got {other:?}"),
        }
    }

    #[test]
    fn bootstrap_message_is_suppressed() {
        let line = r##"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"# AGENTS.md instructions for repo\n<INSTRUCTIONS>do things</INSTRUCTIONS>"}]}}"##;
        assert!(normalize_line(line, 1).unwrap().is_none());
    }

    #[test]
    fn context_compacted_falls_back_to_default_message() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"event_msg","payload":{"type":"context_compacted"}}"#;
        let item = normalize_line(line, 1).unwrap().unwrap();
        assert!(item.is_context_compaction);
        assert_eq!(
            item.content,
            vec![ContentBlock::text("Conversation compacted to continue this session.")]
        );
    }

    #[test]
    fn turn_aborted_tag_overrides_item() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"<turn_aborted>stopped early</turn_aborted>"}]}}"#;
        let item = normalize_line(line, 1).unwrap().unwrap();
        assert!(item.is_turn_aborted);
        assert_eq!(item.content, vec![ContentBlock::text("stopped early")]);
    }

    #[test]
    fn agent_reasoning_event_is_always_suppressed() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"event_msg","payload":{"type":"agent_reasoning","text":"thinking..."}}"#;
        assert!(normalize_line(line, 1).unwrap().is_none());
    }

    #[test]
    fn view_image_path_is_compacted() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"function_call","name":"view_image","arguments":"{\"path\":\"/home/user/project/.cdev/shot.png\"}","call_id":"call_9"}}"#;
        let item = normalize_line(line, 1).unwrap().unwrap();
        match &item.content[0] {
            ContentBlock::ToolUse { tool_input, .. } => {
                assert_eq!(tool_input.get("path").unwrap(), ".cdev/shot.png");
            }
            other => panic!("expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn malformed_envelope_json_is_an_error() {
        assert!(normalize_line("{not json", 1).is_err());
    }

    #[test]
    fn malformed_sub_payload_is_silently_skipped() {
        let line = r#"{"timestamp":"2026-01-31T12:00:02Z","type":"response_item","payload":{"type":"message","role":"user"}}"#;
        assert!(normalize_line(line, 1).unwrap().is_none());
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
