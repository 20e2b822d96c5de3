use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One piece of a normalized conversation item.
///
/// Tagged union, not a subclass hierarchy: every variant the normalizer (C2)
/// can produce is enumerated here, matching spec §3's closed content-block
/// shape one-to-one with its serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        text: String,
    },
    ToolUse {
        tool_name: String,
        tool_id: String,
        tool_input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        ContentBlock::Thinking { text: text.into() }
    }

    /// Returns the trimmed text for `Text`/`Thinking` blocks, used by the
    /// streamer's thinking-dedup and bootstrap-suppression checks (§4.2, §4.4).
    pub fn as_plain_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } | ContentBlock::Thinking { text } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. })
    }
}
