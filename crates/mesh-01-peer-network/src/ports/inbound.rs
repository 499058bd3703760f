//! # Inbound Ports (Driving Ports)

use crate::domain::identity::NetworkIdentity;
use crate::events::NetworkError;
use async_trait::async_trait;
use shared_types::{PeerInfo, SignedOrder};

#[async_trait]
pub trait PeerNetworkApi: Send + Sync {
    /// Dial the configured bootstrap list. Returns the number of peers
    /// connected when the round, including its grace pause, completes.
    ///
    /// Only a malformed bootstrap list is an error; failed dials are logged.
    async fn bootstrap(&self) -> Result<usize, NetworkError>;

    /// Connect to an operator-supplied peer. Every failure is returned.
    async fn add_peer(&self, peer: PeerInfo) -> Result<(), NetworkError>;

    /// Broadcast locally admitted orders. Returns how many peers they were
    /// sent to.
    async fn share_orders(&self, orders: Vec<SignedOrder>) -> Result<usize, NetworkError>;

    /// Aggregate health: number of connected peers.
    fn peer_count(&self) -> usize;

    fn identity(&self) -> &NetworkIdentity;
}
