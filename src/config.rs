//! Peerscope Configuration
//!
//! Timing of the latency tracker and topology refresh, plus the primary relay
//! used to highlight relay nodes. Defaults match a browser node polling its
//! peers every ten seconds and redrawing once a second.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::latency::{TrackerConfig, TrackerError};
use crate::types::Multiaddr;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid tracker timing: {0}")]
    Tracker(#[from] TrackerError),

    #[error("{0}")]
    Invalid(String),
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerscopeConfig {
    // === Latency ===

    /// Interval between probe rounds (milliseconds)
    pub ping_interval_ms: u64,

    /// Per-probe timeout (milliseconds), none to wait for the transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout_ms: Option<u64>,

    // === Topology ===

    /// Interval between topology redraws (milliseconds)
    pub refresh_interval_ms: u64,

    /// Multiaddr of the configured primary relay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_relay: Option<Multiaddr>,

    /// Mark the primary relay in projections and graphs
    pub highlight_primary_relay: bool,
}

impl Default for PeerscopeConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: 10_000,
            probe_timeout_ms: Some(5_000),
            refresh_interval_ms: 1_000,
            primary_relay: None,
            highlight_primary_relay: true,
        }
    }
}

impl PeerscopeConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // Builder-style methods for CLI overrides

    pub fn with_ping_interval_ms(mut self, ms: u64) -> Self {
        self.ping_interval_ms = ms;
        self
    }

    pub fn with_probe_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.probe_timeout_ms = ms;
        self
    }

    pub fn with_refresh_interval_ms(mut self, ms: u64) -> Self {
        self.refresh_interval_ms = ms;
        self
    }

    pub fn with_primary_relay(mut self, relay: Option<Multiaddr>) -> Self {
        self.primary_relay = relay;
        self
    }

    pub fn with_highlight_primary_relay(mut self, highlight: bool) -> Self {
        self.highlight_primary_relay = highlight;
        self
    }

    /// Tracker timing derived from this config
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            ping_interval: Duration::from_millis(self.ping_interval_ms),
            probe_timeout: self.probe_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Primary relay to mark, if highlighting is on
    pub fn effective_primary_relay(&self) -> Option<&Multiaddr> {
        self.primary_relay
            .as_ref()
            .filter(|_| self.highlight_primary_relay)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracker_config().validate()?;

        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PeerscopeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker_config(), TrackerConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.effective_primary_relay(), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peerscope.toml");

        let config = PeerscopeConfig::default()
            .with_ping_interval_ms(2_000)
            .with_probe_timeout_ms(Some(1_000))
            .with_primary_relay(Some("/ip4/5.6.7.8/tcp/2/p2p/QmRelay".parse().unwrap()));
        config.save(&path).unwrap();

        let loaded = PeerscopeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.tracker_config().probe_timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peerscope.toml");
        std::fs::write(&path, "refresh_interval_ms = 250\n").unwrap();

        let loaded = PeerscopeConfig::load(&path).unwrap();
        assert_eq!(loaded.refresh_interval_ms, 250);
        assert_eq!(loaded.ping_interval_ms, 10_000);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PeerscopeConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "primary_relay = \"not-a-multiaddr\"\n").unwrap();
        assert!(matches!(PeerscopeConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation() {
        let zero = PeerscopeConfig::default().with_ping_interval_ms(0);
        assert!(matches!(zero.validate(), Err(ConfigError::Tracker(TrackerError::InvalidInterval))));

        let slow_probe = PeerscopeConfig::default().with_probe_timeout_ms(Some(10_000));
        assert!(matches!(slow_probe.validate(), Err(ConfigError::Tracker(_))));

        let no_refresh = PeerscopeConfig::default().with_refresh_interval_ms(0);
        assert!(matches!(no_refresh.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_highlight_toggle() {
        let relay: Multiaddr = "/ip4/5.6.7.8/tcp/2".parse().unwrap();
        let config = PeerscopeConfig::default().with_primary_relay(Some(relay.clone()));
        assert_eq!(config.effective_primary_relay(), Some(&relay));

        let config = config.with_highlight_primary_relay(false);
        assert_eq!(config.effective_primary_relay(), None);
    }
}
