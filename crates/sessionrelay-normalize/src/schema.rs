//! The session log's line envelope (§3): one JSON object per line, tagged by
//! `type`, with a payload shape that depends on the tag. Field names here
//! follow the on-disk vocabulary exactly since the normalizer's behavior
//! depends on parsing them losslessly, not on any naming convenience.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogLine {
    SessionMeta(SessionMetaRecord),
    TurnContext(TurnContextRecord),
    ResponseItem(ResponseItemRecord),
    EventMsg(EventMsgRecord),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionMetaRecord {
    pub timestamp: String,
    pub payload: SessionMetaPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionMetaPayload {
    pub id: String,
    pub cwd: String,
    pub originator: String,
    pub cli_version: String,
    #[serde(default)]
    pub model_provider: Option<String>,
    #[serde(default)]
    pub git: Option<GitInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitInfo {
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
}

/// Accepted but not projected into `ConversationItem`: `turn_context` only
/// refines working directory and model name (§3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurnContextRecord {
    pub timestamp: String,
    pub payload: TurnContextPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurnContextPayload {
    pub cwd: String,
    pub model: String,
    #[serde(default)]
    pub approval_policy: Option<String>,
    #[serde(default)]
    pub sandbox_policy: Option<Value>,
    #[serde(default)]
    pub effort: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponseItemRecord {
    pub timestamp: String,
    pub payload: ResponseItemPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseItemPayload {
    Message(MessagePayload),
    FunctionCall(FunctionCallPayload),
    FunctionCallOutput(FunctionCallOutputPayload),
    CustomToolCall(CustomToolCallPayload),
    CustomToolCallOutput(CustomToolCallOutputPayload),
    Reasoning(ReasoningPayload),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagePayload {
    pub role: String,
    pub content: MessageContentField,
}

/// `content` is documented as "string or array of text blocks" (§3);
/// both shapes appear in the wild.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContentField {
    Plain(String),
    Blocks(Vec<MessageContentBlock>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContentBlock {
    InputText { text: String },
    OutputText { text: String },
    #[serde(other)]
    Unknown,
}

impl MessageContentField {
    pub fn joined_text(&self) -> String {
        match self {
            MessageContentField::Plain(text) => text.clone(),
            MessageContentField::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    MessageContentBlock::InputText { text } | MessageContentBlock::OutputText { text } => {
                        Some(text.as_str())
                    }
                    MessageContentBlock::Unknown => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionCallPayload {
    pub name: String,
    pub arguments: String,
    pub call_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionCallOutputPayload {
    pub call_id: String,
    pub output: String,
}

/// `input` may be a raw JSON object or a plain string (§4.2); callers decide
/// how to wrap it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomToolCallPayload {
    pub call_id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomToolCallOutputPayload {
    pub call_id: String,
    pub output: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReasoningPayload {
    #[serde(default)]
    pub summary: Vec<SummaryText>,
    #[serde(default)]
    pub encrypted_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SummaryText {
    SummaryText {
        text: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventMsgRecord {
    pub timestamp: String,
    pub payload: EventMsgPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMsgPayload {
    UserMessage(UserMessagePayload),
    AgentMessage(AgentMessagePayload),
    AgentReasoning(AgentReasoningPayload),
    TurnAborted(TurnAbortedPayload),
    ContextCompacted(ContextCompactedPayload),
    /// Covers `token_count` and every other sub-discriminator (§3: "others — ignored").
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserMessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentMessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentReasoningPayload {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurnAbortedPayload {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextCompactedPayload {
    #[serde(default)]
    pub user_summary: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
