use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentBlock;

/// Who produced a [`ConversationItem`]. The normalizer (C2) only ever emits
/// these two; `developer`/`system` message lines are dropped upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One normalized entry from a session log line.
///
/// `line` is the 1-based source line number and is stable across re-reads of
/// an append-only file, which lets callers resume a tail from a byte offset
/// without losing the ability to correlate an item back to its source line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    pub line: u64,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub is_context_compaction: bool,
    pub is_turn_aborted: bool,
    pub content: Vec<ContentBlock>,
}

impl ConversationItem {
    /// `len(content) > 0` is the suppression invariant: a caller that would
    /// otherwise construct an item with empty content must instead produce
    /// no item at all.
    pub fn is_well_formed(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn has_only_tool_blocks(&self) -> bool {
        !self.content.is_empty() && self.content.iter().all(ContentBlock::is_tool)
    }

    /// The text of a single `thinking` block, if this item is exactly that
    /// and nothing else. Used by the streamer's thinking de-dup (§4.4).
    pub fn sole_thinking_text(&self) -> Option<&str> {
        match self.content.as_slice() {
            [ContentBlock::Thinking { text }] => Some(text.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(content: Vec<ContentBlock>) -> ConversationItem {
        ConversationItem {
            line: 1,
            timestamp: Utc::now(),
            role: Role::Assistant,
            is_context_compaction: false,
            is_turn_aborted: false,
            content,
        }
    }

    #[test]
    fn well_formed_requires_nonempty_content() {
        assert!(!item(vec![]).is_well_formed());
        assert!(item(vec![ContentBlock::text("hi")]).is_well_formed());
    }

    #[test]
    fn has_only_tool_blocks_rejects_mixed_content() {
        let tool = ContentBlock::ToolUse {
            tool_name: "ls".into(),
            tool_id: "1".into(),
            tool_input: Default::default(),
        };
        assert!(item(vec![tool.clone()]).has_only_tool_blocks());
        assert!(!item(vec![tool, ContentBlock::text("hi")]).has_only_tool_blocks());
        assert!(!item(vec![]).has_only_tool_blocks());
    }

    #[test]
    fn sole_thinking_text_requires_exactly_one_block() {
        let one = item(vec![ContentBlock::thinking("pondering")]);
        assert_eq!(one.sole_thinking_text(), Some("pondering"));
        let two = item(vec![ContentBlock::thinking("a"), ContentBlock::text("b")]);
        assert_eq!(two.sole_thinking_text(), None);
    }
}
