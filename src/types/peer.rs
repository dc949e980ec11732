// Peer - Opaque peer identifier
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Globally unique identifier of a network participant.
///
/// Kept as the textual form the transport hands out (base58 multihash for
/// libp2p peers). Ordering is lexicographic on that text, which is what edge
/// ids and every other tie-break rely on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentifier(String);

impl PeerIdentifier {
    /// Wrap a peer id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Textual form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PeerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerIdentifier {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerIdentifier {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PeerIdentifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PeerIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lexicographic_order() {
        let a = PeerIdentifier::from("a");
        let b = PeerIdentifier::from("b");
        assert!(a < b);

        let qm = PeerIdentifier::from("QmRelay");
        let d = PeerIdentifier::from("12D3KooW");
        assert!(d < qm);
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(PeerIdentifier::from("QmPeer"), 1);
        assert_eq!(map.get("QmPeer"), Some(&1));
    }

    #[test]
    fn test_serde_transparent() {
        let id = PeerIdentifier::from("QmPeer");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"QmPeer\"");

        let back: PeerIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
