// Topology - Connection projection and node/edge graph reconciliation
// Principle: Pure derivations, deterministic merges, no hidden state

pub mod debug_info;
pub mod graph;
pub mod projector;
pub mod pseudonym;

pub use debug_info::{DebugInfo, SelfInfo};
pub use graph::{
    edge_id, GraphEdge, GraphNode, NodeColor, NodeLabel, SharedTopology, TopologyGraph,
    SELF_NODE_SIZE,
};
pub use projector::{is_primary_relay, is_relay_peer_multiaddr, project, PeerConnectionInfo};
pub use pseudonym::pseudonym_for_peer_id;

use crate::types::{Multiaddr, MultiaddrError};

/// Errors from projection and graph building
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid multiaddr: {0}")]
    InvalidMultiaddr(#[from] MultiaddrError),
}

/// Parse a relay address given as text, such as a primary relay override
pub fn parse_relay_multiaddr(s: &str) -> Result<Multiaddr, TopologyError> {
    Ok(s.trim().parse::<Multiaddr>()?)
}
