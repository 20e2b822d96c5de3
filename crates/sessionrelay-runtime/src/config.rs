//! Runtime defaults (debounce, quiescence, channel capacity, heartbeat,
//! rate limit), loadable from a TOML file with a couple of environment
//! overrides, but constructible purely in-memory for tests since nothing
//! here requires a file to exist.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How long after the last file-change signal the streamer waits before
/// re-reading a session file, how long the 1s-poll/quiet backstop allows
/// before forcing a read anyway, how long of quiet after catching up to
/// EOF counts as "read complete", how many in-flight events the hub's
/// ingress queue and each client's outbound queue hold, how often the
/// heartbeat notification fires, and the default inbound rate limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub debounce_ms: u64,
    pub poll_quiet_ms: u64,
    pub read_complete_quiescence_secs: u64,
    pub refresh_lease_secs: u64,
    pub channel_capacity: usize,
    pub heartbeat_secs: u64,
    pub rate_limit_per_minute: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            debounce_ms: 200,
            poll_quiet_ms: 500,
            read_complete_quiescence_secs: 3,
            refresh_lease_secs: 30,
            channel_capacity: 256,
            heartbeat_secs: 30,
            rate_limit_per_minute: 600,
        }
    }
}

impl RuntimeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_quiet(&self) -> Duration {
        Duration::from_millis(self.poll_quiet_ms)
    }

    pub fn read_complete_quiescence(&self) -> Duration {
        Duration::from_secs(self.read_complete_quiescence_secs)
    }

    pub fn refresh_lease(&self) -> Duration {
        Duration::from_secs(self.refresh_lease_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    /// Loads from `SESSIONRELAY_CONFIG` if set, else returns the default —
    /// there is no implicit well-known path, unlike a per-user data
    /// directory layout, since this daemon is bound to a workspace the
    /// caller already names explicitly.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os("SESSIONRELAY_CONFIG") {
            Some(path) => Self::load_from(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|err| Error::Config(err.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u32("SESSIONRELAY_RATE_LIMIT_PER_MINUTE") {
            self.rate_limit_per_minute = v;
        }
        if let Some(v) = env_u64("SESSIONRELAY_HEARTBEAT_SECS") {
            self.heartbeat_secs = v;
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = RuntimeConfig::default();
        assert_eq!(config.debounce_ms, 200);
        assert_eq!(config.read_complete_quiescence_secs, 3);
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(config.rate_limit_per_minute, 600);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn round_trips_through_a_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionrelay.toml");
        let mut config = RuntimeConfig::default();
        config.rate_limit_per_minute = 1200;
        config.save_to(&path).unwrap();

        let loaded = RuntimeConfig::load_from(&path).unwrap();
        assert_eq!(loaded.rate_limit_per_minute, 1200);
    }
}
