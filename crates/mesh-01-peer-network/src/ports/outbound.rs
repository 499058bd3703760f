//! # Outbound Ports (Driven Ports)

use crate::domain::address::AddrInfo;
use crate::domain::identity::PeerId;
use crate::domain::messages::OrderMessage;
use crate::events::NetworkError;
use async_trait::async_trait;
use shared_types::{PeerInfo, SignedOrder, ValidationResponse};

/// Connection-oriented transport between peers.
///
/// The host owns all live connection state. Everything it hands out is a copy.
#[async_trait]
pub trait PeerHost: Send + Sync {
    fn local_peer_id(&self) -> PeerId;

    /// Addresses remote peers can dial, including the `/p2p/<id>` suffix.
    fn listen_addrs(&self) -> Vec<String>;

    /// Dial a peer and complete the handshake. Connecting to an already
    /// connected peer succeeds without a new dial.
    async fn connect(&self, info: &AddrInfo) -> Result<(), NetworkError>;

    fn is_connected(&self, peer: &PeerId) -> bool;

    fn connected_peers(&self) -> Vec<PeerInfo>;

    /// Send to every connected peer except `exclude`. Returns the number of
    /// peers the message was queued for.
    async fn publish(&self, message: OrderMessage, exclude: Option<&PeerId>) -> Result<usize, NetworkError>;

    /// Ask one peer for the peers it knows on the same rendezvous.
    async fn find_peers(&self, peer: &PeerId) -> Result<Vec<PeerInfo>, NetworkError>;
}

/// Where orders received from peers are submitted for validation.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn receive_orders(&self, orders: Vec<SignedOrder>) -> Result<ValidationResponse, NetworkError>;
}
