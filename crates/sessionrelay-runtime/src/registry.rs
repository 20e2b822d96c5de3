//! Client session & focus registry (C7): the server-side singleton that
//! turns per-client focus changes into `session_joined`/`session_left`
//! events and tracks workspace subscriptions for watcher lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sessionrelay_types::{BridgeEvent, EventPayload, SessionJoinedPayload, SessionLeftPayload};

use crate::hub::{EventHub, SubscriberId};
use crate::subscriber::{FilteredSubscriber, Focus};

struct ClientEntry<S> {
    subscriber_id: SubscriberId,
    subscriber: Arc<FilteredSubscriber<S>>,
}

/// Keyed by client id. One registry per running server.
pub struct ClientRegistry<S> {
    hub: Arc<EventHub>,
    clients: Mutex<HashMap<String, ClientEntry<S>>>,
}

impl<S: crate::hub::Subscriber + 'static> ClientRegistry<S> {
    pub fn new(hub: Arc<EventHub>) -> Self {
        ClientRegistry {
            hub,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `client_id`'s send adapter with the hub through a fresh
    /// `FilteredSubscriber` and returns it so the caller can drive
    /// subscribe/unsubscribe calls directly.
    pub fn connect(&self, client_id: impl Into<String>, inner: S) -> Arc<FilteredSubscriber<S>> {
        let client_id = client_id.into();
        let subscriber = Arc::new(FilteredSubscriber::new(inner));
        let subscriber_id = self.hub.register(subscriber.clone());
        self.clients.lock().unwrap().insert(
            client_id,
            ClientEntry {
                subscriber_id,
                subscriber: subscriber.clone(),
            },
        );
        subscriber
    }

    /// Removes `client_id`'s subscriber, publishes a `session_left` if it
    /// had a focus set, and returns the set of workspaces that `client_id`
    /// was subscribed to and that no other remaining client still is (the
    /// caller should stop watching those).
    pub fn disconnect(&self, client_id: &str) -> Vec<String> {
        let mut clients = self.clients.lock().unwrap();
        let Some(entry) = clients.remove(client_id) else {
            return Vec::new();
        };
        self.hub.unregister(entry.subscriber_id);

        if let Some(focus) = entry.subscriber.focus() {
            let remaining = remaining_viewers(&clients, &focus, None);
            self.publish_session_left(&focus, remaining);
        }

        let orphaned = entry.subscriber.subscribed_workspaces();
        orphaned
            .into_iter()
            .filter(|ws| !clients.values().any(|c| c.subscriber.subscribed_workspaces().contains(ws)))
            .collect()
    }

    /// Implements §4.7's `SetSessionFocus` sequence: write the new focus,
    /// announce `session_joined` to any other current viewers, and announce
    /// `session_left` for the previous focus if it changed.
    pub fn set_focus(&self, client_id: &str, workspace_id: &str, session_id: &str) {
        let clients = self.clients.lock().unwrap();
        let Some(entry) = clients.get(client_id) else {
            return;
        };
        let previous = entry.subscriber.focus();
        entry.subscriber.set_session_focus(workspace_id, session_id);
        let new_focus = Focus {
            workspace_id: workspace_id.to_string(),
            session_id: session_id.to_string(),
        };

        let other_viewers = remaining_viewers(&clients, &new_focus, Some(client_id));
        if other_viewers > 0 {
            self.publish_session_joined(&new_focus, other_viewers + 1);
        }

        if let Some(previous) = previous {
            if previous != new_focus {
                let remaining = remaining_viewers(&clients, &previous, Some(client_id));
                self.publish_session_left(&previous, remaining);
            }
        }
    }

    pub fn clear_focus(&self, client_id: &str) {
        let clients = self.clients.lock().unwrap();
        let Some(entry) = clients.get(client_id) else {
            return;
        };
        if let Some(previous) = entry.subscriber.focus() {
            entry.subscriber.clear_session_focus();
            let remaining = remaining_viewers(&clients, &previous, Some(client_id));
            self.publish_session_left(&previous, remaining);
        }
    }

    fn publish_session_joined(&self, focus: &Focus, viewer_count: u64) {
        let event = BridgeEvent::new(EventPayload::SessionJoined(SessionJoinedPayload {
            workspace_id: focus.workspace_id.clone(),
            session_id: focus.session_id.clone(),
            viewer_count,
        }))
        .with_workspace(focus.workspace_id.clone())
        .with_session(focus.session_id.clone());
        self.hub.publish(event);
    }

    fn publish_session_left(&self, focus: &Focus, remaining_viewers: u64) {
        let event = BridgeEvent::new(EventPayload::SessionLeft(SessionLeftPayload {
            workspace_id: focus.workspace_id.clone(),
            session_id: focus.session_id.clone(),
            remaining_viewers,
        }))
        .with_workspace(focus.workspace_id.clone())
        .with_session(focus.session_id.clone());
        self.hub.publish(event);
    }
}

fn remaining_viewers<S: crate::hub::Subscriber>(
    clients: &HashMap<String, ClientEntry<S>>,
    focus: &Focus,
    excluding: Option<&str>,
) -> u64 {
    clients
        .iter()
        .filter(|(id, _)| excluding != Some(id.as_str()))
        .filter(|(_, entry)| entry.subscriber.focus().as_ref() == Some(focus))
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Recording(Arc<StdMutex<Vec<BridgeEvent>>>);

    impl crate::hub::Subscriber for Recording {
        fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn settle() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    #[test]
    fn second_viewer_triggers_session_joined_with_count_two() {
        let hub = Arc::new(EventHub::new());
        let registry = ClientRegistry::new(hub.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        registry.connect("observer", Recording(log.clone()));
        registry.connect("a", Recording(Arc::new(StdMutex::new(Vec::new()))));
        registry.connect("b", Recording(Arc::new(StdMutex::new(Vec::new()))));

        registry.set_focus("a", "ws1", "sess1");
        settle();
        assert!(log.lock().unwrap().is_empty());

        registry.set_focus("b", "ws1", "sess1");
        settle();
        let events = log.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0].payload {
            EventPayload::SessionJoined(payload) => assert_eq!(payload.viewer_count, 2),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn moving_focus_emits_session_left_for_the_old_tuple() {
        let hub = Arc::new(EventHub::new());
        let registry = ClientRegistry::new(hub.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        registry.connect("observer", Recording(log.clone()));
        registry.connect("a", Recording(Arc::new(StdMutex::new(Vec::new()))));

        registry.set_focus("a", "ws1", "sess1");
        settle();
        registry.set_focus("a", "ws1", "sess2");
        settle();

        let events = log.lock().unwrap();
        assert!(events.iter().any(|e| matches!(&e.payload, EventPayload::SessionLeft(p) if p.session_id == "sess1")));
    }

    #[test]
    fn disconnect_returns_workspaces_with_no_remaining_subscribers() {
        let hub = Arc::new(EventHub::new());
        let registry = ClientRegistry::new(hub.clone());
        let a = registry.connect("a", Recording(Arc::new(StdMutex::new(Vec::new()))));
        a.subscribe_workspace("ws1");
        let orphaned = registry.disconnect("a");
        assert_eq!(orphaned, vec!["ws1".to_string()]);
    }

    #[test]
    fn disconnect_keeps_workspace_alive_if_another_client_subscribes() {
        let hub = Arc::new(EventHub::new());
        let registry = ClientRegistry::new(hub.clone());
        let a = registry.connect("a", Recording(Arc::new(StdMutex::new(Vec::new()))));
        let b = registry.connect("b", Recording(Arc::new(StdMutex::new(Vec::new()))));
        a.subscribe_workspace("ws1");
        b.subscribe_workspace("ws1");
        let orphaned = registry.disconnect("a");
        assert!(orphaned.is_empty());
    }
}
