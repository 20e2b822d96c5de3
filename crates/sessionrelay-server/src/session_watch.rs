//! Ref-counts per-session streamers across clients (`session/watch` /
//! `session/unwatch`, §4.8). The first client to watch a session starts its
//! streamer and bridges its output into the hub, tagged with the server's
//! workspace id; the last client to unwatch stops it (§5 cancellation).

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sessionrelay_runtime::{EventHub, RuntimeConfig, SessionStreamer, StreamerHandle};
use sessionrelay_types::BridgeEvent;

use crate::error::Result;

struct WatchEntry {
    _handle: StreamerHandle,
    watchers: HashSet<String>,
}

pub struct SessionWatchRegistry {
    hub: Arc<EventHub>,
    workspace_id: String,
    config: RuntimeConfig,
    entries: Mutex<HashMap<String, WatchEntry>>,
}

impl SessionWatchRegistry {
    pub fn new(hub: Arc<EventHub>, workspace_id: impl Into<String>) -> Self {
        Self::with_config(hub, workspace_id, RuntimeConfig::default())
    }

    pub fn with_config(hub: Arc<EventHub>, workspace_id: impl Into<String>, config: RuntimeConfig) -> Self {
        SessionWatchRegistry {
            hub,
            workspace_id: workspace_id.into(),
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: a second `watch` call for a session already being
    /// streamed just adds `client_id` to its watcher set.
    pub fn watch(
        &self,
        client_id: &str,
        session_id: &str,
        path: PathBuf,
        agent_type: Option<String>,
    ) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(session_id) {
            entry.watchers.insert(client_id.to_string());
            return Ok(());
        }

        let streamer = SessionStreamer::attach_with_config(session_id.to_string(), path, agent_type, &self.config)?;
        let (handle, rx) = streamer.into_parts();
        spawn_bridge(self.hub.clone(), self.workspace_id.clone(), rx);

        let mut watchers = HashSet::new();
        watchers.insert(client_id.to_string());
        entries.insert(session_id.to_string(), WatchEntry { _handle: handle, watchers });
        Ok(())
    }

    pub fn unwatch(&self, client_id: &str, session_id: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(session_id) {
            entry.watchers.remove(client_id);
            if entry.watchers.is_empty() {
                entries.remove(session_id);
            }
        }
    }

    /// Removes `client_id` from every session it was watching; called on
    /// disconnect.
    pub fn unwatch_all(&self, client_id: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| {
            entry.watchers.remove(client_id);
            !entry.watchers.is_empty()
        });
    }
}

fn spawn_bridge(hub: Arc<EventHub>, workspace_id: String, rx: std::sync::mpsc::Receiver<BridgeEvent>) {
    std::thread::Builder::new()
        .name("session-watch-bridge".to_string())
        .spawn(move || {
            while let Ok(mut event) = rx.recv() {
                if event.workspace_id.is_none() {
                    event.workspace_id = Some(workspace_id.clone());
                }
                hub.publish(event);
            }
        })
        .expect("failed to spawn session-watch bridge thread");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watching_a_path_with_no_parent_directory_returns_an_error() {
        let hub = Arc::new(EventHub::new());
        let registry = SessionWatchRegistry::new(hub, "ws1");
        let result = registry.watch("client-a", "sess1", PathBuf::from("/no/such/dir/file.jsonl"), None);
        assert!(result.is_err());
    }

    #[test]
    fn unwatch_all_removes_a_client_from_every_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollout-x.jsonl");
        std::fs::write(&path, "").unwrap();
        let hub = Arc::new(EventHub::new());
        let registry = SessionWatchRegistry::new(hub, "ws1");
        registry.watch("client-a", "sess1", path, None).unwrap();
        registry.unwatch_all("client-a");
        let entries = registry.entries.lock().unwrap();
        assert!(entries.is_empty());
    }
}
