//! # Peer Network (mesh-01)
//!
//! Forms and maintains the mesh of peers and disseminates admitted orders.
//!
//! ## Responsibilities
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | Bootstrap | Dial every configured peer concurrently under one shared timeout, then pause for a grace interval |
//! | Discovery | Periodically ask connected peers for others on the same rendezvous |
//! | Gossip    | Validate received orders through the [`OrderSink`] and relay only accepted ones |
//! | AddPeer   | Operator-directed dial; every failure goes back to the caller |
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   PeerNetworkApi   ┌──────────────┐   PeerHost   ┌──────────────┐
//! │ RPC / runtime │ ─────────────────→ │ PeerNetwork  │ ───────────→ │ TcpPeerHost  │
//! └───────────────┘                    └──────┬───────┘              └──────┬───────┘
//!                                             │ OrderSink                    │ InboundOrders
//!                                             ↓                              ↓
//!                                       order watcher               PeerNetwork::run_gossip
//! ```
//!
//! Rendezvous and topic strings are derived from the chain id alone, so any
//! two nodes on the same chain find each other without negotiation.

pub mod adapters;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::TcpPeerHost;
pub use domain::address::{addr_infos_from_list, AddrInfo, AddressError, Host, PeerAddr};
pub use domain::config::{default_bootstrap_list, NetworkConfig};
pub use domain::identity::{NetworkIdentity, PeerId, DHT_PROTOCOL_ID, PROTOCOL_VERSION};
pub use domain::messages::{InboundOrders, OrderMessage, WireMessage};
pub use domain::seen_cache::SeenOrderCache;
pub use events::{NetworkError, NetworkLogEvent};
pub use ports::inbound::PeerNetworkApi;
pub use ports::outbound::{OrderSink, PeerHost};
pub use service::PeerNetwork;
