// Swarm - libp2p adapter for the connection ledger and latency probes
// Principle: Swarm events go through the ledger, ping results feed the tracker

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::core::ConnectedPoint;
use libp2p::swarm::{ConnectionId, NetworkBehaviour, Swarm, SwarmEvent};
use libp2p::{ping, PeerId};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ConnectionLedger, PeerEvent};
use crate::latency::{LatencyProbe, LatencyTracker, ProbeError};
use crate::types::{ConnectionDirection, ConnectionRecord, Multiaddr, MultiaddrError, PeerIdentifier};

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<PeerId> for PeerIdentifier {
    fn from(peer: PeerId) -> Self {
        PeerIdentifier::new(peer.to_base58())
    }
}

impl TryFrom<&libp2p::Multiaddr> for Multiaddr {
    type Error = MultiaddrError;

    fn try_from(addr: &libp2p::Multiaddr) -> Result<Self, Self::Error> {
        addr.to_string().parse()
    }
}

/// Ledger key for a swarm connection
pub fn connection_key(id: ConnectionId) -> String {
    format!("{:?}", id)
}

fn direction(endpoint: &ConnectedPoint) -> ConnectionDirection {
    if endpoint.is_dialer() {
        ConnectionDirection::Outbound
    } else {
        ConnectionDirection::Inbound
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ConnectionLedger {
    /// Ledger seeded with the swarm's identity and current listeners
    pub fn from_swarm<B: NetworkBehaviour>(swarm: &Swarm<B>) -> Self {
        let listen_addrs = swarm
            .listeners()
            .filter_map(|addr| Multiaddr::try_from(addr).ok())
            .collect();
        Self::new((*swarm.local_peer_id()).into(), listen_addrs)
    }

    /// Apply a swarm event; returns the peer event it caused, if any
    pub fn observe<E>(&mut self, event: &SwarmEvent<E>) -> Option<PeerEvent> {
        match event {
            SwarmEvent::ConnectionEstablished {
                peer_id,
                connection_id,
                endpoint,
                ..
            } => {
                let addr = match Multiaddr::try_from(endpoint.get_remote_address()) {
                    Ok(addr) => addr,
                    Err(e) => {
                        warn!("Ignoring connection to {} with unusable address: {}", peer_id, e);
                        return None;
                    }
                };
                self.connection_opened(ConnectionRecord::new(
                    connection_key(*connection_id),
                    (*peer_id).into(),
                    addr,
                    direction(endpoint),
                ))
            }
            SwarmEvent::ConnectionClosed { connection_id, .. } => {
                self.connection_closed(&connection_key(*connection_id))
            }
            SwarmEvent::NewListenAddr { address, .. } => {
                if let Ok(addr) = Multiaddr::try_from(address) {
                    self.add_listen_addr(addr);
                }
                None
            }
            SwarmEvent::ExpiredListenAddr { address, .. } => {
                if let Ok(addr) = Multiaddr::try_from(address) {
                    self.remove_listen_addr(&addr);
                }
                None
            }
            _ => None,
        }
    }
}

/// Drive the swarm until the behaviour emits an event.
///
/// Connection events update the ledger and the tracker along the way.
pub async fn next_behaviour_event<B: NetworkBehaviour>(
    swarm: &mut Swarm<B>,
    ledger: &mut ConnectionLedger,
    tracker: &LatencyTracker,
) -> B::ToSwarm {
    loop {
        match swarm.select_next_some().await {
            SwarmEvent::Behaviour(event) => return event,
            event => {
                if let Some(peer_event) = ledger.observe(&event) {
                    peer_event.apply_to(tracker);
                }
            }
        }
    }
}

// =============================================================================
// PING PROBE
// =============================================================================

/// Probe answered from the swarm's ping protocol.
///
/// The ping behaviour measures on its own schedule; each probe consumes the
/// latest round trip recorded for the peer since the previous probe.
#[derive(Debug, Default)]
pub struct PingProbe {
    latest: Mutex<HashMap<PeerIdentifier, Duration>>,
}

impl PingProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ping outcome from the swarm
    pub fn record(&self, event: &ping::Event) {
        let peer = PeerIdentifier::from(event.peer);
        match &event.result {
            Ok(rtt) => {
                self.latest
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(peer, *rtt);
            }
            Err(failure) => debug!("Ping to {} failed: {}", peer, failure),
        }
    }
}

#[async_trait]
impl LatencyProbe for PingProbe {
    async fn probe(&self, peer: &PeerIdentifier) -> Result<Duration, ProbeError> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(peer)
            .ok_or_else(|| ProbeError::NoPong(peer.to_string()))
    }
}
