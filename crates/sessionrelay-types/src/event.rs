use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::conversation::ConversationItem;

/// The closed set of event types the hub (C5) ever carries. `EventPayload`'s
/// serde tag *is* this discriminator (see its `#[serde(tag = "type")]`); this
/// enum exists only so callers can match on an event's kind without matching
/// the full payload, e.g. the focus filter's permission-event check (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ClaudeMessage,
    ClaudeStatus,
    StreamReadComplete,
    FileChanged,
    Heartbeat,
    SessionJoined,
    SessionLeft,
    PermissionRequest,
    PermissionResponse,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClaudeMessage => "claude_message",
            EventKind::ClaudeStatus => "claude_status",
            EventKind::StreamReadComplete => "stream_read_complete",
            EventKind::FileChanged => "file_changed",
            EventKind::Heartbeat => "heartbeat",
            EventKind::SessionJoined => "session_joined",
            EventKind::SessionLeft => "session_left",
            EventKind::PermissionRequest => "permission_request",
            EventKind::PermissionResponse => "permission_response",
        }
    }

    /// The "permission events (closed subset)" referenced by the focus
    /// filter in §4.6.
    pub fn is_permission_event(&self) -> bool {
        matches!(self, EventKind::PermissionRequest | EventKind::PermissionResponse)
    }
}

/// Type-specific event content. The serde tag on this enum is the event's
/// immutable `type` field (§4.9); each variant names its wire payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    ClaudeMessage(ConversationItem),
    ClaudeStatus(ClaudeStatusPayload),
    StreamReadComplete(StreamReadCompletePayload),
    FileChanged(FileChangedPayload),
    Heartbeat(HeartbeatPayload),
    SessionJoined(SessionJoinedPayload),
    SessionLeft(SessionLeftPayload),
    PermissionRequest(PermissionRequestPayload),
    PermissionResponse(PermissionResponsePayload),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::ClaudeMessage(_) => EventKind::ClaudeMessage,
            EventPayload::ClaudeStatus(_) => EventKind::ClaudeStatus,
            EventPayload::StreamReadComplete(_) => EventKind::StreamReadComplete,
            EventPayload::FileChanged(_) => EventKind::FileChanged,
            EventPayload::Heartbeat(_) => EventKind::Heartbeat,
            EventPayload::SessionJoined(_) => EventKind::SessionJoined,
            EventPayload::SessionLeft(_) => EventKind::SessionLeft,
            EventPayload::PermissionRequest(_) => EventKind::PermissionRequest,
            EventPayload::PermissionResponse(_) => EventKind::PermissionResponse,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Ok,
    RepoNotFound,
    NotGitRepo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaudeStatusPayload {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_status: Option<RepoStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamReadCompletePayload {
    pub message_count: u64,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileChangedPayload {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatPayload {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionJoinedPayload {
    pub workspace_id: String,
    pub session_id: String,
    pub viewer_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionLeftPayload {
    pub workspace_id: String,
    pub session_id: String,
    pub remaining_viewers: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionRequestPayload {
    pub tool_use_id: String,
    pub tool_name: String,
    pub tool_input: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionResponsePayload {
    pub tool_use_id: String,
    pub approved: bool,
}

/// A single event as it travels through the hub (C5) and is serialized on
/// the wire (C9). Routing fields are optional: a `claude_message` carries
/// `session_id`/`agent_type`, a `session_joined` carries `workspace_id`,
/// and so on, but none of them is mandatory at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl BridgeEvent {
    pub fn new(payload: EventPayload) -> Self {
        BridgeEvent {
            payload,
            timestamp: Utc::now(),
            workspace_id: None,
            session_id: None,
            agent_type: None,
            request_id: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_payload_tag() {
        let event = BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default()));
        assert_eq!(event.kind(), EventKind::Heartbeat);
        assert_eq!(event.kind().as_str(), "heartbeat");
    }

    #[test]
    fn permission_events_are_recognized() {
        assert!(EventKind::PermissionRequest.is_permission_event());
        assert!(EventKind::PermissionResponse.is_permission_event());
        assert!(!EventKind::ClaudeMessage.is_permission_event());
    }

    #[test]
    fn serializes_with_flattened_type_tag() {
        let event = BridgeEvent::new(EventPayload::SessionJoined(SessionJoinedPayload {
            workspace_id: "ws1".into(),
            session_id: "s1".into(),
            viewer_count: 2,
        }))
        .with_workspace("ws1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session_joined");
        assert_eq!(json["payload"]["viewer_count"], 2);
        assert_eq!(json["workspace_id"], "ws1");
        assert!(json.get("session_id").is_none() || event.session_id.is_some());
    }
}
