//! # Network Identity
//!
//! The peer id of this node and the strings every node on the same chain
//! derives identically: the discovery rendezvous and the gossip topic.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol id of the routing substrate.
pub const DHT_PROTOCOL_ID: &str = "/injective-0x-mesh-dht/version/1";

/// Version component of the rendezvous and topic strings.
pub const PROTOCOL_VERSION: u32 = 1;

/// Opaque peer identifier, compared for equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// A fresh 32-byte identity rendered as lowercase hex.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Logical network a node belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub peer_id: PeerId,
    pub chain_id: u64,
}

impl NetworkIdentity {
    #[must_use]
    pub fn new(peer_id: PeerId, chain_id: u64) -> Self {
        Self { peer_id, chain_id }
    }

    /// String peers of the same network look each other up under.
    #[must_use]
    pub fn rendezvous(&self) -> String {
        format!("/0x-mesh/network/{}/version/{PROTOCOL_VERSION}", self.chain_id)
    }

    /// Topic admitted orders are broadcast on.
    #[must_use]
    pub fn topic(&self) -> String {
        format!("/0x-orders/network/{}/version/{PROTOCOL_VERSION}", self.chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_hex_and_distinct() {
        let a = PeerId::random();
        let b = PeerId::random();
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_derived_strings_depend_only_on_chain() {
        let a = NetworkIdentity::new(PeerId::random(), 1337);
        let b = NetworkIdentity::new(PeerId::random(), 1337);
        assert_eq!(a.rendezvous(), "/0x-mesh/network/1337/version/1");
        assert_eq!(a.topic(), "/0x-orders/network/1337/version/1");
        assert_eq!(a.rendezvous(), b.rendezvous());
        assert_ne!(a.topic(), NetworkIdentity::new(a.peer_id.clone(), 1).topic());
    }
}
