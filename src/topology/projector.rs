//! Connection Info Projector
//!
//! Turns a raw connection snapshot into UI-ready records: direction, relay
//! classification, and the hop relay of circuit connections. Stateless; the
//! same input always yields the same output.

use serde::{Deserialize, Serialize};

use super::TopologyError;
use crate::types::{
    ConnectionDirection, ConnectionRecord, ConnectionStatus, ConnectionType, Multiaddr,
    PeerIdentifier, P2P_CIRCUIT_PROTOCOL, P2P_WEBRTC_STAR_PROTOCOL,
};

/// One connection as seen by the graph and the debug panels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnectionInfo {
    pub id: String,

    pub peer_id: PeerIdentifier,

    pub multiaddr: Multiaddr,

    pub direction: ConnectionDirection,

    pub status: ConnectionStatus,

    /// Latency window of the remote peer, newest first (ms)
    #[serde(default)]
    pub latency: Vec<f64>,

    #[serde(rename = "type")]
    pub connection_type: ConnectionType,

    /// Address looks like a standing relay listener (no circuit, no star)
    #[serde(default)]
    pub is_peer_relay: bool,

    /// Address is the configured primary relay
    #[serde(default)]
    pub is_peer_relay_primary: bool,

    /// Relay the circuit goes through (relayed connections only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop_relay_peer_id: Option<PeerIdentifier>,
}

impl PeerConnectionInfo {
    /// Attach latency samples
    pub fn with_latency(mut self, latency: Vec<f64>) -> Self {
        self.latency = latency;
        self
    }
}

/// Project a connection snapshot.
///
/// `None` is a caller bug and fails with `InvalidInput`; an empty slice is a
/// valid snapshot and projects to nothing. Output order follows input order.
pub fn project(
    connections: Option<&[ConnectionRecord]>,
    primary_relay: Option<&Multiaddr>,
) -> Result<Vec<PeerConnectionInfo>, TopologyError> {
    let connections = connections
        .ok_or_else(|| TopologyError::InvalidInput("connection list is absent".to_string()))?;

    Ok(connections
        .iter()
        .map(|connection| project_connection(connection, primary_relay))
        .collect())
}

/// Project a single connection
pub fn project_connection(
    connection: &ConnectionRecord,
    primary_relay: Option<&Multiaddr>,
) -> PeerConnectionInfo {
    let connection_type = connection.connection_type();
    let hop_relay_peer_id = match connection_type {
        ConnectionType::Relayed => hop_relay_peer_id(&connection.remote_addr),
        ConnectionType::Direct => None,
    };

    PeerConnectionInfo {
        id: connection.id.clone(),
        peer_id: connection.remote_peer.clone(),
        multiaddr: connection.remote_addr.clone(),
        direction: connection.direction,
        status: connection.status,
        latency: Vec::new(),
        connection_type,
        is_peer_relay: is_relay_peer_multiaddr(&connection.remote_addr),
        is_peer_relay_primary: is_primary_relay(&connection.remote_addr, primary_relay),
        hop_relay_peer_id,
    }
}

/// A multiaddr without circuit or webrtc-star components belongs to a relay node
pub fn is_relay_peer_multiaddr(addr: &Multiaddr) -> bool {
    !(addr.has_protocol(P2P_CIRCUIT_PROTOCOL) || addr.has_protocol(P2P_WEBRTC_STAR_PROTOCOL))
}

/// Canonical string match against the configured primary relay
pub fn is_primary_relay(addr: &Multiaddr, primary_relay: Option<&Multiaddr>) -> bool {
    primary_relay.map_or(false, |primary| addr.as_str() == primary.as_str())
}

/// Relay a circuit address hops through.
///
/// Read from the part before the last `p2p-circuit` component; when that part
/// names no peer, fall back to the id in the stripped circuit suffix.
fn hop_relay_peer_id(addr: &Multiaddr) -> Option<PeerIdentifier> {
    let (relay, destination) = addr.decapsulate_circuit()?;
    relay.peer_id().or_else(|| destination.peer_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str, peer: &str, addr: &str) -> ConnectionRecord {
        ConnectionRecord::new(
            id,
            PeerIdentifier::from(peer),
            addr.parse().unwrap(),
            ConnectionDirection::Outbound,
        )
    }

    #[test]
    fn test_empty_and_absent_input() {
        let relay: Multiaddr = "/ip4/5.6.7.8/tcp/2".parse().unwrap();
        assert!(project(Some(&[]), Some(&relay)).unwrap().is_empty());
        assert!(project(Some(&[]), None).unwrap().is_empty());
        assert!(matches!(project(None, Some(&relay)), Err(TopologyError::InvalidInput(_))));
    }

    #[test]
    fn test_relayed_connection() {
        let connections = [conn("c1", "QmTarget", "/ip4/1.2.3.4/tcp/1/p2p-circuit/p2p/QmRelay")];
        let projected = project(Some(&connections), None).unwrap();

        assert_eq!(projected[0].connection_type, ConnectionType::Relayed);
        assert_eq!(projected[0].hop_relay_peer_id, Some(PeerIdentifier::from("QmRelay")));
        assert!(!projected[0].is_peer_relay);
        assert!(!projected[0].is_peer_relay_primary);
    }

    #[test]
    fn test_hop_relay_from_relay_part() {
        let connections = [conn(
            "c1",
            "QmTarget",
            "/ip4/1.2.3.4/tcp/1/p2p/QmRelay/p2p-circuit/p2p/QmTarget",
        )];
        let projected = project(Some(&connections), None).unwrap();
        assert_eq!(projected[0].hop_relay_peer_id, Some(PeerIdentifier::from("QmRelay")));
    }

    #[test]
    fn test_hop_relay_omitted_without_peer_id() {
        let connections = [conn("c1", "QmTarget", "/ip4/1.2.3.4/tcp/1/p2p-circuit")];
        let projected = project(Some(&connections), None).unwrap();

        assert_eq!(projected[0].connection_type, ConnectionType::Relayed);
        assert_eq!(projected[0].hop_relay_peer_id, None);

        let json = serde_json::to_value(&projected[0]).unwrap();
        assert!(json.get("hopRelayPeerId").is_none());
    }

    #[test]
    fn test_direct_connection_is_relay_peer() {
        let relay: Multiaddr = "/ip4/5.6.7.8/tcp/2".parse().unwrap();
        let connections = [
            conn("c1", "QmPrimary", "/ip4/5.6.7.8/tcp/2"),
            conn("c2", "QmOther", "/ip4/9.9.9.9/tcp/2"),
        ];
        let projected = project(Some(&connections), Some(&relay)).unwrap();

        assert_eq!(projected[0].connection_type, ConnectionType::Direct);
        assert!(projected[0].is_peer_relay);
        assert!(projected[0].is_peer_relay_primary);
        assert_eq!(projected[0].hop_relay_peer_id, None);

        assert!(projected[1].is_peer_relay);
        assert!(!projected[1].is_peer_relay_primary);
    }

    #[test]
    fn test_webrtc_star_is_not_relay() {
        let connections = [conn(
            "c1",
            "QmStarPeer",
            "/dns4/star.example/tcp/443/wss/p2p-webrtc-star/p2p/QmStarPeer",
        )];
        let projected = project(Some(&connections), None).unwrap();
        assert!(!projected[0].is_peer_relay);
        assert_eq!(projected[0].connection_type, ConnectionType::Direct);
    }

    #[test]
    fn test_order_preserved_and_pure() {
        let connections = [
            conn("c2", "QmB", "/ip4/2.2.2.2/tcp/1"),
            conn("c1", "QmA", "/ip4/1.1.1.1/tcp/1"),
            conn("c3", "QmC", "/ip4/1.1.1.1/tcp/1/p2p/QmA/p2p-circuit/p2p/QmC"),
        ];

        let first = project(Some(&connections), None).unwrap();
        let second = project(Some(&connections), None).unwrap();
        assert_eq!(first, second);

        let ids: Vec<_> = first.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1", "c3"]);
    }

    #[test]
    fn test_json_field_names() {
        let relay: Multiaddr = "/ip4/5.6.7.8/tcp/2".parse().unwrap();
        let connections = [conn("c1", "QmPrimary", "/ip4/5.6.7.8/tcp/2")];
        let projected = project(Some(&connections), Some(&relay)).unwrap();
        let json = serde_json::to_value(&projected[0]).unwrap();

        assert_eq!(json["peerId"], "QmPrimary");
        assert_eq!(json["type"], "direct");
        assert_eq!(json["isPeerRelay"], true);
        assert_eq!(json["isPeerRelayPrimary"], true);
        assert_eq!(json["latency"], serde_json::json!([]));
    }

    #[test]
    fn test_plain_connection_info_deserializes() {
        // Older reports carry no relay flags
        let json = r#"{
            "id": "c1",
            "peerId": "QmA",
            "multiaddr": "/ip4/1.1.1.1/tcp/1",
            "direction": "inbound",
            "status": "open",
            "type": "direct"
        }"#;
        let info: PeerConnectionInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_peer_relay);
        assert!(info.latency.is_empty());
        assert_eq!(info.direction, ConnectionDirection::Inbound);
    }
}
