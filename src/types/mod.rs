// Types - Shared data model for peers, addresses and connections
// Principle: The transport owns connections, we only read snapshots of them

pub mod connection;
pub mod multiaddr;
pub mod peer;

pub use connection::{ConnectionDirection, ConnectionRecord, ConnectionStatus, ConnectionType};
pub use multiaddr::{Multiaddr, MultiaddrError, P2P_CIRCUIT_PROTOCOL, P2P_WEBRTC_STAR_PROTOCOL};
pub use peer::PeerIdentifier;
