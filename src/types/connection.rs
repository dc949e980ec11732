// Connection - Snapshot of one transport-level connection
use serde::{Deserialize, Serialize};

use super::multiaddr::{Multiaddr, P2P_CIRCUIT_PROTOCOL, P2P_WEBRTC_STAR_PROTOCOL};
use super::peer::PeerIdentifier;

/// Which side opened the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionDirection {
    Inbound,
    Outbound,
}

/// Connection lifecycle status as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Open,
    Closing,
    Closed,
}

/// Whether traffic flows straight to the peer or through a relay hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Direct,
    Relayed,
}

/// One active connection to a remote peer.
///
/// Immutable once created: a reconnect shows up as a new record with a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Connection id, unique among open connections
    pub id: String,

    /// Remote peer
    #[serde(rename = "peerId")]
    pub remote_peer: PeerIdentifier,

    /// Remote address
    #[serde(rename = "multiaddr")]
    pub remote_addr: Multiaddr,

    /// Dial direction
    pub direction: ConnectionDirection,

    /// Status at snapshot time
    pub status: ConnectionStatus,
}

impl ConnectionRecord {
    /// Create an open connection record
    pub fn new(
        id: impl Into<String>,
        remote_peer: PeerIdentifier,
        remote_addr: Multiaddr,
        direction: ConnectionDirection,
    ) -> Self {
        Self {
            id: id.into(),
            remote_peer,
            remote_addr,
            direction,
            status: ConnectionStatus::Open,
        }
    }

    /// Relayed iff the address goes through a circuit and is not a
    /// webrtc-star signalling address
    pub fn connection_type(&self) -> ConnectionType {
        if self.remote_addr.has_protocol(P2P_CIRCUIT_PROTOCOL)
            && !self.remote_addr.has_protocol(P2P_WEBRTC_STAR_PROTOCOL)
        {
            ConnectionType::Relayed
        } else {
            ConnectionType::Direct
        }
    }
}
