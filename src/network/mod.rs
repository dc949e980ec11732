// Network - Transport adapter: open connections in, peer events out
// Principle: The ledger is the only place that decides when a peer comes and goes

#[cfg(feature = "libp2p")]
pub mod swarm;

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::latency::LatencyTracker;
use crate::types::{ConnectionRecord, Multiaddr, PeerIdentifier};

// =============================================================================
// TRANSPORT VIEW
// =============================================================================

/// Read-only view of a running transport
pub trait TransportView {
    /// Local peer id
    fn local_peer_id(&self) -> PeerIdentifier;

    /// Addresses the local peer advertises
    fn listen_multiaddrs(&self) -> Vec<Multiaddr>;

    /// Snapshot of open connections
    fn connections(&self) -> Vec<ConnectionRecord>;

    /// Peers with at least one open connection, sorted
    fn connected_peers(&self) -> Vec<PeerIdentifier> {
        self.connections()
            .into_iter()
            .map(|c| c.remote_peer)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// PEER EVENTS
// =============================================================================

/// Peer-level change derived from connection events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// First connection to the peer opened
    Connected(PeerIdentifier),
    /// Last connection to the peer closed
    Disconnected(PeerIdentifier),
}

impl PeerEvent {
    pub fn peer(&self) -> &PeerIdentifier {
        match self {
            PeerEvent::Connected(peer) | PeerEvent::Disconnected(peer) => peer,
        }
    }

    /// Forward to the latency tracker
    pub fn apply_to(&self, tracker: &LatencyTracker) {
        match self {
            PeerEvent::Connected(peer) => tracker.on_peer_connect(peer),
            PeerEvent::Disconnected(peer) => tracker.on_peer_disconnect(peer),
        }
    }
}

// =============================================================================
// CONNECTION LEDGER
// =============================================================================

/// Open connections of the local peer, keyed by connection id
#[derive(Debug, Clone)]
pub struct ConnectionLedger {
    local_peer: PeerIdentifier,
    listen_addrs: Vec<Multiaddr>,
    connections: BTreeMap<String, ConnectionRecord>,
    /// Open connection count per remote peer
    per_peer: BTreeMap<PeerIdentifier, usize>,
}

impl ConnectionLedger {
    pub fn new(local_peer: PeerIdentifier, listen_addrs: Vec<Multiaddr>) -> Self {
        Self {
            local_peer,
            listen_addrs,
            connections: BTreeMap::new(),
            per_peer: BTreeMap::new(),
        }
    }

    /// Record an opened connection.
    ///
    /// Returns `Connected` when this is the first open connection to the
    /// peer. A re-reported connection id replaces the stored record.
    pub fn connection_opened(&mut self, record: ConnectionRecord) -> Option<PeerEvent> {
        if let Some(previous) = self.connections.get(&record.id) {
            if previous.remote_peer == record.remote_peer {
                self.connections.insert(record.id.clone(), record);
                return None;
            }
            // Connection id reused for another peer
            let previous_peer = previous.remote_peer.clone();
            self.connections.remove(&record.id);
            self.release(&previous_peer);
        }

        let peer = record.remote_peer.clone();
        debug!("Connection {} opened to {} via {}", record.id, peer, record.remote_addr);
        self.connections.insert(record.id.clone(), record);

        let count = self.per_peer.entry(peer.clone()).or_insert(0);
        *count += 1;
        (*count == 1).then(|| PeerEvent::Connected(peer))
    }

    /// Record a closed connection.
    ///
    /// Returns `Disconnected` when it was the last open connection to the
    /// peer. Unknown ids are ignored.
    pub fn connection_closed(&mut self, connection_id: &str) -> Option<PeerEvent> {
        let record = self.connections.remove(connection_id)?;
        debug!("Connection {} to {} closed", connection_id, record.remote_peer);

        if self.release(&record.remote_peer) {
            Some(PeerEvent::Disconnected(record.remote_peer))
        } else {
            None
        }
    }

    /// Drop one connection from the peer's count; true when none remain
    fn release(&mut self, peer: &PeerIdentifier) -> bool {
        match self.per_peer.get_mut(peer) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.per_peer.remove(peer);
                true
            }
            None => false,
        }
    }

    /// Replace the advertised addresses
    pub fn set_listen_addrs(&mut self, listen_addrs: Vec<Multiaddr>) {
        self.listen_addrs = listen_addrs;
    }

    pub fn add_listen_addr(&mut self, addr: Multiaddr) {
        if !self.listen_addrs.contains(&addr) {
            self.listen_addrs.push(addr);
        }
    }

    pub fn remove_listen_addr(&mut self, addr: &Multiaddr) {
        self.listen_addrs.retain(|a| a != addr);
    }

    pub fn is_connected(&self, peer: &PeerIdentifier) -> bool {
        self.per_peer.contains_key(peer)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl TransportView for ConnectionLedger {
    fn local_peer_id(&self) -> PeerIdentifier {
        self.local_peer.clone()
    }

    fn listen_multiaddrs(&self) -> Vec<Multiaddr> {
        self.listen_addrs.clone()
    }

    fn connections(&self) -> Vec<ConnectionRecord> {
        self.connections.values().cloned().collect()
    }

    fn connected_peers(&self) -> Vec<PeerIdentifier> {
        self.per_peer.keys().cloned().collect()
    }
}
