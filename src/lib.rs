//! Peerscope - peer liveness and topology model
//!
//! Tracks which remote peers a node is connected to, keeps a rolling window of
//! round-trip times per peer, and folds self reports (one peer's own view of
//! itself and its connections) into a deduplicated node/edge graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  transport events ──► ConnectionLedger ──► PeerEvent          │
//! │                              │                 │              │
//! │                              ▼                 ▼              │
//! │                    project() (pure)     LatencyTracker        │
//! │                              │          (poll task, probes)   │
//! │                              ▼                 │              │
//! │                         DebugInfo ◄────────────┘              │
//! │                              │                                │
//! │                              ▼                                │
//! │                TopologyGraph::fold ──► nodes / edges          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport itself and any rendering are outside this crate: the
//! transport is reached through [`network::TransportView`] and the
//! [`latency::LatencyProbe`] capability, renderers read graph snapshots.

pub mod config;
pub mod latency;
pub mod network;
pub mod topology;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, PeerscopeConfig};
pub use latency::{
    LatencyProbe, LatencyTracker, LatencyWindow, PeerLatencyMap, ProbeError, TrackerConfig,
    TrackerError, TrackerStats,
};
pub use network::{ConnectionLedger, PeerEvent, TransportView};
pub use topology::{
    edge_id, parse_relay_multiaddr, project, pseudonym_for_peer_id, DebugInfo, GraphEdge,
    GraphNode, NodeColor, NodeLabel, PeerConnectionInfo, SelfInfo, SharedTopology,
    TopologyError, TopologyGraph,
};
pub use types::{
    ConnectionDirection, ConnectionRecord, ConnectionStatus, ConnectionType, Multiaddr,
    PeerIdentifier,
};
