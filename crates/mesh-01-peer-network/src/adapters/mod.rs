//! # Adapters Layer
//!
//! - [`tcp`]: [`PeerHost`](crate::ports::outbound::PeerHost) over plain TCP
//!   with length-prefixed JSON frames

pub mod tcp;

pub use tcp::TcpPeerHost;
