//! Server-wide state and connection entry points. One `Server` is built per
//! running process and bound to exactly one workspace (see `DESIGN.md` for
//! why: the core's `workspace_id` concept has no backing field to source it
//! from, so this crate resolves it as one workspace per server instance).

use std::path::PathBuf;
use std::sync::Arc;

use sessionrelay_index::IndexCache;
use sessionrelay_runtime::{ClientRegistry, EventHub, RuntimeConfig};
use sessionrelay_types::{BridgeEvent, EventPayload, HeartbeatPayload};

use crate::agent::AgentRunner;
use crate::connection::ClientSink;
use crate::file_fetch::FileFetcher;
use crate::session_watch::SessionWatchRegistry;

/// §4.8: absent an explicit configured limit, 600 inbound messages/minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 600;

pub struct Server {
    pub(crate) hub: Arc<EventHub>,
    pub(crate) registry: Arc<ClientRegistry<ClientSink>>,
    pub(crate) watches: Arc<SessionWatchRegistry>,
    pub(crate) index: Arc<IndexCache>,
    pub(crate) workspace_id: String,
    pub(crate) workspace_root: PathBuf,
    pub(crate) agent_runner: Arc<dyn AgentRunner>,
    pub(crate) file_fetcher: Arc<dyn FileFetcher>,
    pub(crate) rate_limit_per_minute: u32,
    config: RuntimeConfig,
}

impl Server {
    pub fn new(
        workspace_id: impl Into<String>,
        workspace_root: PathBuf,
        sessions_root: PathBuf,
        agent_runner: Arc<dyn AgentRunner>,
        file_fetcher: Arc<dyn FileFetcher>,
    ) -> Self {
        Self::with_config(
            workspace_id,
            workspace_root,
            sessions_root,
            agent_runner,
            file_fetcher,
            RuntimeConfig::default(),
        )
    }

    /// Same as [`new`](Self::new), but with the hub's ingress capacity,
    /// streamer debounce/quiescence, index refresh lease, rate limit, and
    /// heartbeat interval all drawn from `config`.
    pub fn with_config(
        workspace_id: impl Into<String>,
        workspace_root: PathBuf,
        sessions_root: PathBuf,
        agent_runner: Arc<dyn AgentRunner>,
        file_fetcher: Arc<dyn FileFetcher>,
        config: RuntimeConfig,
    ) -> Self {
        let workspace_id = workspace_id.into();
        let hub = Arc::new(EventHub::with_capacity(config.channel_capacity));
        let registry = Arc::new(ClientRegistry::new(hub.clone()));
        let watches = Arc::new(SessionWatchRegistry::with_config(
            hub.clone(),
            workspace_id.clone(),
            config.clone(),
        ));
        let index = Arc::new(IndexCache::with_lease(sessions_root, config.refresh_lease()));
        let rate_limit_per_minute = config.rate_limit_per_minute;
        Server {
            hub,
            registry,
            watches,
            index,
            workspace_id,
            workspace_root,
            agent_runner,
            file_fetcher,
            rate_limit_per_minute,
            config,
        }
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Spawns the heartbeat ticker. Runs for the lifetime of the process;
    /// there is no shutdown handle since the server itself has none.
    pub fn spawn_heartbeat(self: &Arc<Self>) {
        let hub = self.hub.clone();
        let interval = self.config.heartbeat_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                hub.publish(BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default())));
            }
        });
    }
}

/// Serves one connection over stdin/stdout, matching how a process-per-client
/// bridge would typically be spawned (§6's CLI surface runs the server bound
/// to a sessions root; the transport it listens on is the caller's choice).
pub async fn serve_stdio(server: Arc<Server>) {
    server.spawn_heartbeat();
    crate::connection::handle_connection(server, tokio::io::stdin(), tokio::io::stdout()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NullAgentRunner;
    use crate::file_fetch::FilesystemFileFetcher;

    #[test]
    fn new_server_binds_the_given_workspace_id() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(
            "ws1",
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            Arc::new(NullAgentRunner),
            Arc::new(FilesystemFileFetcher::new(dir.path())),
        );
        assert_eq!(server.workspace_id, "ws1");
        assert_eq!(server.rate_limit_per_minute, DEFAULT_RATE_LIMIT_PER_MINUTE);
    }
}
