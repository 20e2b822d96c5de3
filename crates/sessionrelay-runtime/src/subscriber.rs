//! Filtered subscriber (C6): wraps any hub subscriber and applies the
//! workspace-subscription and session-focus filters before delegating.

use std::collections::HashSet;
use std::sync::Mutex;

use sessionrelay_types::BridgeEvent;

use crate::hub::Subscriber;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub workspace_id: String,
    pub session_id: String,
}

pub struct FilteredSubscriber<S> {
    inner: S,
    workspaces: Mutex<HashSet<String>>,
    focus: Mutex<Option<Focus>>,
}

impl<S: Subscriber> FilteredSubscriber<S> {
    pub fn new(inner: S) -> Self {
        FilteredSubscriber {
            inner,
            workspaces: Mutex::new(HashSet::new()),
            focus: Mutex::new(None),
        }
    }

    pub fn subscribe_workspace(&self, workspace_id: impl Into<String>) {
        self.workspaces.lock().unwrap().insert(workspace_id.into());
    }

    pub fn unsubscribe_workspace(&self, workspace_id: &str) {
        self.workspaces.lock().unwrap().remove(workspace_id);
    }

    /// Clears the subscription set so every workspace's events pass again.
    pub fn subscribe_all(&self) {
        self.workspaces.lock().unwrap().clear();
    }

    pub fn set_session_focus(&self, workspace_id: impl Into<String>, session_id: impl Into<String>) {
        *self.focus.lock().unwrap() = Some(Focus {
            workspace_id: workspace_id.into(),
            session_id: session_id.into(),
        });
    }

    pub fn clear_session_focus(&self) {
        *self.focus.lock().unwrap() = None;
    }

    /// No-op unless the current focus's workspace equals `workspace_id`;
    /// also a no-op for an empty `workspace_id` so callers can't accidentally
    /// clear an unset focus by passing an empty string.
    pub fn clear_session_focus_if_workspace(&self, workspace_id: &str) {
        if workspace_id.is_empty() {
            return;
        }
        let mut focus = self.focus.lock().unwrap();
        if focus.as_ref().is_some_and(|f| f.workspace_id == workspace_id) {
            *focus = None;
        }
    }

    pub fn focus(&self) -> Option<Focus> {
        self.focus.lock().unwrap().clone()
    }

    pub fn subscribed_workspaces(&self) -> HashSet<String> {
        self.workspaces.lock().unwrap().clone()
    }

    fn passes_workspace_filter(&self, event: &BridgeEvent) -> bool {
        let workspaces = self.workspaces.lock().unwrap();
        if workspaces.is_empty() {
            return true;
        }
        match &event.workspace_id {
            Some(ws) if !ws.is_empty() => workspaces.contains(ws),
            _ => true,
        }
    }

    fn passes_focus_filter(&self, event: &BridgeEvent) -> bool {
        if !event.kind().is_permission_event() {
            return true;
        }
        let focus = self.focus.lock().unwrap();
        let Some(focus) = focus.as_ref() else {
            return true;
        };
        match &event.workspace_id {
            Some(ws) if !ws.is_empty() => ws == &focus.workspace_id,
            _ => true,
        }
    }
}

impl<S: Subscriber> Subscriber for FilteredSubscriber<S> {
    fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
        if self.passes_workspace_filter(&event) && self.passes_focus_filter(&event) {
            self.inner.send(event)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionrelay_types::{EventPayload, HeartbeatPayload, PermissionRequestPayload};
    use std::sync::{Arc, Mutex as StdMutex};

    struct Recording(Arc<StdMutex<Vec<BridgeEvent>>>);

    impl Subscriber for Recording {
        fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn permission_request(workspace_id: &str) -> BridgeEvent {
        BridgeEvent::new(EventPayload::PermissionRequest(PermissionRequestPayload {
            tool_use_id: "call_1".into(),
            tool_name: "exec_command".into(),
            tool_input: Default::default(),
        }))
        .with_workspace(workspace_id)
    }

    #[test]
    fn empty_workspace_set_passes_everything() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sub = FilteredSubscriber::new(Recording(log.clone()));
        sub.send(BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default())))
            .unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn workspace_filter_rejects_unsubscribed_workspace() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sub = FilteredSubscriber::new(Recording(log.clone()));
        sub.subscribe_workspace("ws1");
        sub.send(
            BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default())).with_workspace("ws2"),
        )
        .unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn global_events_always_pass_workspace_filter() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sub = FilteredSubscriber::new(Recording(log.clone()));
        sub.subscribe_workspace("ws1");
        sub.send(BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default())))
            .unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn focus_filter_blocks_permission_events_from_other_workspaces() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sub = FilteredSubscriber::new(Recording(log.clone()));
        sub.set_session_focus("ws1", "sess1");
        sub.send(permission_request("ws2")).unwrap();
        assert!(log.lock().unwrap().is_empty());
        sub.send(permission_request("ws1")).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn clear_session_focus_if_workspace_is_noop_for_mismatch_or_empty() {
        let sub = FilteredSubscriber::new(Recording(Arc::new(StdMutex::new(Vec::new()))));
        sub.set_session_focus("ws1", "sess1");
        sub.clear_session_focus_if_workspace("");
        assert!(sub.focus().is_some());
        sub.clear_session_focus_if_workspace("ws2");
        assert!(sub.focus().is_some());
        sub.clear_session_focus_if_workspace("ws1");
        assert!(sub.focus().is_none());
    }
}
