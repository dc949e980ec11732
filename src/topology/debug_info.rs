//! Debug Info - A peer's self report
//!
//! A self report is what one peer knows about itself: its id, the addresses
//! it advertises, and its projected connections. Reports are exchanged as
//! JSON so a whole swarm can be surveyed and folded into one graph.

use serde::{Deserialize, Serialize};

use super::projector::{project, PeerConnectionInfo};
use super::TopologyError;
use crate::latency::LatencyTracker;
use crate::network::TransportView;
use crate::types::{Multiaddr, PeerIdentifier};

/// The reporting peer's own identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfInfo {
    pub peer_id: PeerIdentifier,

    /// Currently advertised addresses
    pub multiaddrs: Vec<Multiaddr>,

    /// Primary relay the reporter is configured with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_relay_multiaddr: Option<Multiaddr>,

    /// Peer id embedded in the primary relay address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_relay_peer_id: Option<PeerIdentifier>,
}

impl SelfInfo {
    pub fn new(peer_id: PeerIdentifier, multiaddrs: Vec<Multiaddr>) -> Self {
        Self {
            peer_id,
            multiaddrs,
            primary_relay_multiaddr: None,
            primary_relay_peer_id: None,
        }
    }

    /// Record the primary relay this peer uses
    pub fn with_primary_relay(mut self, primary_relay: Option<&Multiaddr>) -> Self {
        self.primary_relay_peer_id = primary_relay.and_then(Multiaddr::peer_id);
        self.primary_relay_multiaddr = primary_relay.cloned();
        self
    }

    /// Read identity and addresses from the transport
    pub fn from_transport(transport: &impl TransportView) -> Self {
        Self::new(transport.local_peer_id(), transport.listen_multiaddrs())
    }
}

/// One peer's view of itself and its connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub self_info: SelfInfo,
    pub conn_info: Vec<PeerConnectionInfo>,
}

impl DebugInfo {
    pub fn new(self_info: SelfInfo, conn_info: Vec<PeerConnectionInfo>) -> Self {
        Self { self_info, conn_info }
    }

    /// Build the local report from the transport.
    ///
    /// Latency windows are attached when an enabled tracker is given.
    pub fn collect(
        transport: &impl TransportView,
        primary_relay: Option<&Multiaddr>,
        tracker: Option<&LatencyTracker>,
    ) -> Result<Self, TopologyError> {
        let self_info = SelfInfo::from_transport(transport).with_primary_relay(primary_relay);
        let connections = transport.connections();
        let mut conn_info = project(Some(&connections), primary_relay)?;

        if let Some(tracker) = tracker.filter(|t| t.enabled()) {
            let latency = tracker.snapshot();
            conn_info = conn_info
                .into_iter()
                .map(|info| {
                    let values = latency
                        .get(&info.peer_id)
                        .map(|window| window.values())
                        .unwrap_or_default();
                    info.with_latency(values)
                })
                .collect();
        }

        Ok(Self::new(self_info, conn_info))
    }

    /// Parse a report received from a remote peer
    pub fn from_json(json: &str) -> Result<Self, TopologyError> {
        serde_json::from_str(json)
            .map_err(|e| TopologyError::InvalidInput(format!("malformed self report: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, TopologyError> {
        serde_json::to_string(self)
            .map_err(|e| TopologyError::InvalidInput(format!("unserializable self report: {}", e)))
    }
}
