// Graph - Fold self reports into a deduplicated node/edge topology
// Principle: Same reports in any order give the same graph

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::debug_info::DebugInfo;
use super::projector::is_primary_relay;
use super::pseudonym::pseudonym_for_peer_id;
use crate::types::{ConnectionType, Multiaddr, PeerIdentifier};

/// Display size of the local node
pub const SELF_NODE_SIZE: u32 = 14;

// =============================================================================
// NODE ROLES
// =============================================================================

/// Role shown for a node.
///
/// Ordered by precedence: an upsert only ever moves a node up this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    #[serde(rename = "Peer")]
    Peer,

    #[serde(rename = "Relay (secondary)")]
    RelaySecondary,

    #[serde(rename = "Relay (primary)")]
    RelayPrimary,

    #[serde(rename = "Self")]
    SelfNode,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Peer => "Peer",
            NodeLabel::RelaySecondary => "Relay (secondary)",
            NodeLabel::RelayPrimary => "Relay (primary)",
            NodeLabel::SelfNode => "Self",
        }
    }

    pub fn color(&self) -> NodeColor {
        match self {
            NodeLabel::Peer => NodeColor::Blue,
            NodeLabel::RelaySecondary => NodeColor::Yellow,
            NodeLabel::RelayPrimary => NodeColor::Green,
            NodeLabel::SelfNode => NodeColor::Red,
        }
    }
}

/// Color category, serialized as the renderer's palette index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum NodeColor {
    Blue = 0,
    Green = 2,
    Red = 3,
    Yellow = 8,
}

impl From<NodeColor> for u8 {
    fn from(color: NodeColor) -> Self {
        color as u8
    }
}

impl TryFrom<u8> for NodeColor {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(NodeColor::Blue),
            2 => Ok(NodeColor::Green),
            3 => Ok(NodeColor::Red),
            8 => Ok(NodeColor::Yellow),
            other => Err(format!("unknown node color index {}", other)),
        }
    }
}

// =============================================================================
// NODES AND EDGES
// =============================================================================

/// A peer in the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: PeerIdentifier,

    pub label: NodeLabel,

    #[serde(rename = "colorIndex")]
    pub color: NodeColor,

    pub pseudonym: String,

    /// Known addresses of the peer
    pub multiaddrs: BTreeSet<Multiaddr>,

    /// Visual size override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Addresses came from the peer's own report and are not merged further
    #[serde(skip)]
    addrs_from_self_report: bool,
}

impl GraphNode {
    fn new(id: PeerIdentifier) -> Self {
        let pseudonym = pseudonym_for_peer_id(id.as_str());
        Self {
            id,
            label: NodeLabel::Peer,
            color: NodeColor::Blue,
            pseudonym,
            multiaddrs: BTreeSet::new(),
            size: None,
            addrs_from_self_report: false,
        }
    }

    fn promote(&mut self, label: NodeLabel) {
        if label > self.label {
            self.label = label;
            self.color = label.color();
        }
    }
}

/// Undirected link, at most one per pair of peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: PeerIdentifier,
    pub target: PeerIdentifier,
}

/// Canonical edge id: both endpoints in sorted order joined by `-`
pub fn edge_id(a: &PeerIdentifier, b: &PeerIdentifier) -> String {
    if a < b {
        format!("{}-{}", a, b)
    } else {
        format!("{}-{}", b, a)
    }
}

/// A connection as reported by one peer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Route {
    reporter: PeerIdentifier,
    target: PeerIdentifier,
    hop: Option<PeerIdentifier>,
}

// =============================================================================
// TOPOLOGY GRAPH
// =============================================================================

/// Running node and edge maps built from folded self reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyGraph {
    nodes: BTreeMap<PeerIdentifier, GraphNode>,
    edges: BTreeMap<String, GraphEdge>,

    /// Every route reported so far; edges are derived from these
    routes: BTreeSet<Route>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh graph from a full set of reports
    pub fn from_reports<'a>(
        self_peer: &PeerIdentifier,
        reports: impl IntoIterator<Item = &'a DebugInfo>,
        primary_relay: Option<&Multiaddr>,
    ) -> Self {
        let mut graph = Self::new();
        for report in reports {
            graph.fold(self_peer, report, primary_relay);
        }
        graph
    }

    /// Fold one self report into the graph.
    ///
    /// `self_peer` is the local node: only its own report turns a node into
    /// "Self". Folding the same report again changes nothing, and a set of
    /// reports yields the same graph whatever order it is folded in.
    pub fn fold(
        &mut self,
        self_peer: &PeerIdentifier,
        info: &DebugInfo,
        primary_relay: Option<&Multiaddr>,
    ) -> &mut Self {
        let reporter = &info.self_info.peer_id;

        // Reporter: its own addresses are authoritative
        let node = self.upsert_node(reporter);
        node.multiaddrs = info.self_info.multiaddrs.iter().cloned().collect();
        node.addrs_from_self_report = true;
        if reporter == self_peer {
            node.promote(NodeLabel::SelfNode);
            node.size = Some(SELF_NODE_SIZE);
        }

        for conn in &info.conn_info {
            let node = self.upsert_node(&conn.peer_id);
            if !node.addrs_from_self_report {
                node.multiaddrs.insert(conn.multiaddr.clone());
            }
            if conn.is_peer_relay {
                node.promote(NodeLabel::RelaySecondary);
            }
            // Only the caller's primary relay counts; a reporter's own flag
            // refers to its primary, not ours
            if is_primary_relay(&conn.multiaddr, primary_relay) {
                node.promote(NodeLabel::RelayPrimary);
            }

            let hop = match conn.connection_type {
                ConnectionType::Relayed => conn.hop_relay_peer_id.clone(),
                ConnectionType::Direct => None,
            };
            self.routes.insert(Route {
                reporter: reporter.clone(),
                target: conn.peer_id.clone(),
                hop,
            });
        }

        self.rebuild_edges();
        self
    }

    fn upsert_node(&mut self, id: &PeerIdentifier) -> &mut GraphNode {
        let node = self
            .nodes
            .entry(id.clone())
            .or_insert_with(|| GraphNode::new(id.clone()));
        node.pseudonym = pseudonym_for_peer_id(id.as_str());
        node
    }

    /// Re-derive edges from all routes against the current node set.
    ///
    /// A relayed route starts at its hop relay once that relay is a known
    /// node, so a relay learned from a later report re-sources older edges.
    /// When several routes land on one edge, the first in route order sets
    /// its direction.
    fn rebuild_edges(&mut self) {
        let mut edges = BTreeMap::new();

        for route in &self.routes {
            let source = match &route.hop {
                Some(hop) if hop != &route.target && self.nodes.contains_key(hop) => hop,
                _ => &route.reporter,
            };
            if source == &route.target {
                continue;
            }

            let id = edge_id(source, &route.target);
            edges.entry(id.clone()).or_insert_with(|| GraphEdge {
                id,
                source: source.clone(),
                target: route.target.clone(),
            });
        }

        self.edges = edges;
    }

    pub fn node(&self, id: &PeerIdentifier) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.get(id)
    }

    /// Nodes sorted by id
    pub fn nodes(&self) -> Vec<GraphNode> {
        self.nodes.values().cloned().collect()
    }

    /// Edges sorted by id
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.edges.values().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Split into the node and edge maps
    pub fn into_parts(self) -> (BTreeMap<PeerIdentifier, GraphNode>, BTreeMap<String, GraphEdge>) {
        (self.nodes, self.edges)
    }
}

// =============================================================================
// SHARED TOPOLOGY
// =============================================================================

/// Graph with one writer and any number of concurrent readers.
///
/// Folds run on a private copy that is swapped in whole, so readers only
/// ever see complete graphs.
#[derive(Debug, Default)]
pub struct SharedTopology {
    published: RwLock<Arc<TopologyGraph>>,
    writer: Mutex<()>,
}

impl SharedTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current graph
    pub fn snapshot(&self) -> Arc<TopologyGraph> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fold a report and publish the result
    pub fn fold(
        &self,
        self_peer: &PeerIdentifier,
        info: &DebugInfo,
        primary_relay: Option<&Multiaddr>,
    ) -> Arc<TopologyGraph> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = (*self.snapshot()).clone();
        next.fold(self_peer, info, primary_relay);
        self.publish(next)
    }

    /// Replace the graph, e.g. with a fresh rebuild for a new polling pass
    pub fn replace(&self, graph: TopologyGraph) -> Arc<TopologyGraph> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(graph)
    }

    fn publish(&self, graph: TopologyGraph) -> Arc<TopologyGraph> {
        let graph = Arc::new(graph);
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = graph.clone();
        graph
    }
}
