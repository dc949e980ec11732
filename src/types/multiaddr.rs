//! Multiaddr - Self-describing network addresses
//!
//! A multiaddr is a sequence of `/protocol[/value]` components, e.g.
//! `/ip4/1.2.3.4/tcp/4001/p2p/QmRelay/p2p-circuit/p2p/QmTarget`.
//! Only the textual structure is modelled: protocol names are matched, values
//! are kept verbatim and never decoded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::peer::PeerIdentifier;

/// Circuit relay hop marker
pub const P2P_CIRCUIT_PROTOCOL: &str = "p2p-circuit";

/// WebRTC star signalling marker
pub const P2P_WEBRTC_STAR_PROTOCOL: &str = "p2p-webrtc-star";

/// Protocols that identify a peer (current and legacy names)
const PEER_ID_PROTOCOLS: [&str; 2] = ["p2p", "ipfs"];

/// Protocols that are written without a value
const VALUELESS_PROTOCOLS: &[&str] = &[
    P2P_CIRCUIT_PROTOCOL,
    P2P_WEBRTC_STAR_PROTOCOL,
    "p2p-webrtc-direct",
    "p2p-websocket-star",
    "p2p-stardust",
    "webrtc",
    "webrtc-direct",
    "webtransport",
    "ws",
    "wss",
    "tls",
    "noise",
    "quic",
    "quic-v1",
    "http",
    "https",
    "utp",
    "udt",
];

/// Multiaddr parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultiaddrError {
    #[error("empty multiaddr")]
    Empty,

    #[error("multiaddr must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("empty component in multiaddr: {0}")]
    EmptyComponent(String),

    #[error("protocol '{protocol}' is missing its value in {addr}")]
    MissingValue { addr: String, protocol: String },
}

/// One `/protocol[/value]` component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    pub protocol: String,
    pub value: Option<String>,
}

impl Component {
    fn write_to(&self, out: &mut String) {
        out.push('/');
        out.push_str(&self.protocol);
        if let Some(value) = &self.value {
            out.push('/');
            out.push_str(value);
        }
    }
}

/// Structured network address
///
/// Equality, ordering and hashing go through the canonical string only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Multiaddr {
    canonical: String,
    components: Vec<Component>,
}

impl Multiaddr {
    /// Build from already-parsed components
    fn from_components(components: Vec<Component>) -> Self {
        let mut canonical = String::new();
        for component in &components {
            component.write_to(&mut canonical);
        }
        if canonical.is_empty() {
            canonical.push('/');
        }
        Self { canonical, components }
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Parsed components, in order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Does any component use this protocol?
    pub fn has_protocol(&self, protocol: &str) -> bool {
        self.components.iter().any(|c| c.protocol == protocol)
    }

    /// Is this a circuit relayed address?
    pub fn is_circuit(&self) -> bool {
        self.has_protocol(P2P_CIRCUIT_PROTOCOL)
    }

    /// Peer id embedded in the address (last `/p2p/<id>` component)
    pub fn peer_id(&self) -> Option<PeerIdentifier> {
        self.components
            .iter()
            .rev()
            .find(|c| PEER_ID_PROTOCOLS.contains(&c.protocol.as_str()))
            .and_then(|c| c.value.as_deref())
            .map(PeerIdentifier::from)
    }

    /// Split at the last `p2p-circuit` component.
    ///
    /// Returns the relay part (everything before the marker) and the
    /// destination part (everything after it), or `None` for a direct address.
    pub fn decapsulate_circuit(&self) -> Option<(Multiaddr, Multiaddr)> {
        let idx = self
            .components
            .iter()
            .rposition(|c| c.protocol == P2P_CIRCUIT_PROTOCOL)?;

        let relay = Multiaddr::from_components(self.components[..idx].to_vec());
        let destination = Multiaddr::from_components(self.components[idx + 1..].to_vec());
        Some((relay, destination))
    }
}

impl FromStr for Multiaddr {
    type Err = MultiaddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(MultiaddrError::Empty);
        }
        let body = s
            .strip_prefix('/')
            .ok_or_else(|| MultiaddrError::MissingLeadingSlash(s.to_string()))?;
        // A single trailing slash is what decapsulation leaves behind
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut components = Vec::new();
        if body.is_empty() {
            return Ok(Self::from_components(components));
        }

        let mut parts = body.split('/');
        while let Some(protocol) = parts.next() {
            if protocol.is_empty() {
                return Err(MultiaddrError::EmptyComponent(s.to_string()));
            }

            let value = if VALUELESS_PROTOCOLS.contains(&protocol) {
                None
            } else {
                match parts.next() {
                    Some(v) if !v.is_empty() => Some(v.to_string()),
                    _ => {
                        return Err(MultiaddrError::MissingValue {
                            addr: s.to_string(),
                            protocol: protocol.to_string(),
                        })
                    }
                }
            };

            components.push(Component {
                protocol: protocol.to_string(),
                value,
            });
        }

        Ok(Self::from_components(components))
    }
}

impl TryFrom<String> for Multiaddr {
    type Error = MultiaddrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Multiaddr> for String {
    fn from(addr: Multiaddr) -> Self {
        addr.canonical
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl PartialEq for Multiaddr {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Multiaddr {}

impl PartialOrd for Multiaddr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Multiaddr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl std::hash::Hash for Multiaddr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}
