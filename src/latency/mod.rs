// Latency - Rolling round-trip tracking for connected peers
// Principle: Probing is a capability handed in from outside, a missing pong is routine

mod tracker;
mod window;

pub use tracker::{LatencyTracker, PeerLatencyMap, TrackerStats};
pub use window::{LatencyWindow, LATENCY_WINDOW_CAPACITY};

use async_trait::async_trait;
use std::time::Duration;

use crate::types::PeerIdentifier;

/// Default interval between probe rounds
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes allowed to run at once against one peer; further rounds skip it
pub const MAX_PROBES_IN_FLIGHT_PER_PEER: usize = 3;

// =============================================================================
// PROBE CAPABILITY
// =============================================================================

/// Round-trip probe offered by the transport (a libp2p ping, for example)
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    /// Measure the round-trip time to a peer
    async fn probe(&self, peer: &PeerIdentifier) -> Result<Duration, ProbeError>;
}

/// Why a probe produced no sample
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("no pong: {0}")]
    NoPong(String),

    #[error("peer does not support the ping protocol")]
    Unsupported,
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tracker timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Time between probe rounds
    pub ping_interval: Duration,

    /// Abandon a probe after this long (must be shorter than the interval)
    pub probe_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            probe_timeout: Some(DEFAULT_PROBE_TIMEOUT),
        }
    }
}

impl TrackerConfig {
    /// Config with the given interval and no probe timeout
    pub fn with_interval(ping_interval: Duration) -> Self {
        Self {
            ping_interval,
            probe_timeout: None,
        }
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.ping_interval.is_zero() {
            return Err(TrackerError::InvalidInterval);
        }
        if let Some(timeout) = self.probe_timeout {
            if timeout.is_zero() || timeout >= self.ping_interval {
                return Err(TrackerError::InvalidTimeout {
                    timeout,
                    interval: self.ping_interval,
                });
            }
        }
        Ok(())
    }
}

/// Tracker construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("latency tracker must be created inside a tokio runtime")]
    NoRuntime,

    #[error("ping interval must be greater than zero")]
    InvalidInterval,

    #[error("probe timeout {timeout:?} must be non-zero and shorter than the ping interval {interval:?}")]
    InvalidTimeout { timeout: Duration, interval: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            TrackerConfig::with_interval(Duration::ZERO).validate(),
            Err(TrackerError::InvalidInterval)
        );

        let config = TrackerConfig {
            ping_interval: Duration::from_secs(1),
            probe_timeout: Some(Duration::from_secs(2)),
        };
        assert!(matches!(config.validate(), Err(TrackerError::InvalidTimeout { .. })));
    }
}
