//! # Network Events and Errors

use crate::domain::address::AddressError;
use crate::domain::identity::PeerId;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("timed out")]
    Timeout,

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("peer {0} has no dialable address")]
    NoDialableAddress(PeerId),

    #[error("not connected to peer {0}")]
    NotConnected(PeerId),

    #[error("message of {size} bytes exceeds limit of {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("order sink failed: {0}")]
    Sink(String),

    #[error("invalid network configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        NetworkError::Io(e.to_string())
    }
}

/// Structured log records of the peer network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkLogEvent {
    BootstrapStarted {
        peers: usize,
    },
    BootstrapPeerFailed {
        peer_id: PeerId,
        error: String,
    },
    BootstrapComplete {
        attempted: usize,
        connected: usize,
    },
    PeerConnected {
        peer_id: PeerId,
        inbound: bool,
    },
    PeerDisconnected {
        peer_id: PeerId,
    },
    OrdersReceived {
        from: PeerId,
        orders: usize,
        fresh: usize,
    },
    OrdersShared {
        orders: usize,
        peers: usize,
    },
    MalformedOrders {
        from: PeerId,
        count: usize,
    },
    DiscoveryFailed {
        peer_id: PeerId,
        error: String,
    },
}

impl NetworkLogEvent {
    pub fn emit(&self) {
        match self {
            NetworkLogEvent::BootstrapStarted { peers } => info!(peers, "connecting to bootstrap peers"),
            NetworkLogEvent::BootstrapPeerFailed { peer_id, error } => {
                warn!(peer_id = %peer_id, error = %error, "failed to connect to bootstrap peer")
            }
            NetworkLogEvent::BootstrapComplete { attempted, connected } => {
                info!(attempted, connected, "bootstrap complete")
            }
            NetworkLogEvent::PeerConnected { peer_id, inbound } => {
                info!(peer_id = %peer_id, inbound, "peer connected")
            }
            NetworkLogEvent::PeerDisconnected { peer_id } => info!(peer_id = %peer_id, "peer disconnected"),
            NetworkLogEvent::OrdersReceived { from, orders, fresh } => {
                debug!(from = %from, orders, fresh, "received orders from peer")
            }
            NetworkLogEvent::OrdersShared { orders, peers } => debug!(orders, peers, "shared orders"),
            NetworkLogEvent::MalformedOrders { from, count } => {
                warn!(from = %from, count, "dropped malformed orders from peer")
            }
            NetworkLogEvent::DiscoveryFailed { peer_id, error } => {
                debug!(peer_id = %peer_id, error = %error, "peer discovery failed")
            }
        }
    }
}
