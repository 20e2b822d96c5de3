//! §4.9's notification flattening rule: a `BridgeEvent`'s payload fields are
//! merged directly into the notification `params`, with `workspace_id`,
//! `session_id`, `agent_type`, and `timestamp` layered on top. A payload
//! that doesn't serialize to a JSON object is nested under `payload`
//! instead, alongside those same routing fields.

use serde_json::{Map, Value};

use sessionrelay_types::BridgeEvent;

use crate::wire::Notification;

pub fn to_notification(event: &BridgeEvent) -> Notification {
    let method = format!("event/{}", event.kind().as_str());
    let payload_value = serde_json::to_value(&event.payload)
        .ok()
        .and_then(|v| v.get("payload").cloned())
        .unwrap_or(Value::Null);

    let mut params = match payload_value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other);
            map
        }
    };

    params.insert("timestamp".to_string(), Value::String(event.timestamp.to_rfc3339()));
    if let Some(workspace_id) = &event.workspace_id {
        params.insert("workspace_id".to_string(), Value::String(workspace_id.clone()));
    }
    if let Some(session_id) = &event.session_id {
        params.insert("session_id".to_string(), Value::String(session_id.clone()));
    }
    if let Some(agent_type) = &event.agent_type {
        params.insert("agent_type".to_string(), Value::String(agent_type.clone()));
    }

    Notification { method, params: Value::Object(params) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionrelay_types::{EventPayload, HeartbeatPayload, SessionJoinedPayload};

    #[test]
    fn object_payload_is_flattened_into_params() {
        let event = BridgeEvent::new(EventPayload::SessionJoined(SessionJoinedPayload {
            workspace_id: "ws1".into(),
            session_id: "s1".into(),
            viewer_count: 2,
        }))
        .with_workspace("ws1")
        .with_session("s1");
        let note = to_notification(&event);
        assert_eq!(note.method, "event/session_joined");
        assert_eq!(note.params["viewer_count"], 2);
        assert_eq!(note.params["workspace_id"], "ws1");
        assert!(note.params.get("payload").is_none());
    }

    #[test]
    fn empty_object_payload_still_carries_routing_fields() {
        let event = BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default()));
        let note = to_notification(&event);
        assert_eq!(note.method, "event/heartbeat");
        assert!(note.params.get("timestamp").is_some());
        assert!(note.params.get("workspace_id").is_none());
    }
}
