//! # RPC Gateway
//!
//! Local JSON-RPC surface of a mesh node. Clients submit orders, page
//! through the live order set under a snapshot, add peers, read node stats
//! and subscribe to order events or a heartbeat.
//!
//! ## Methods
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `mesh_addOrders` | `[SignedOrder]` | `{accepted, rejected}` |
//! | `mesh_getOrders` | `page, perPage, snapshotID?` | `{snapshotID, snapshotTimestamp, ordersInfos}` |
//! | `mesh_addPeer` | `PeerInfo` | `null` |
//! | `mesh_getStats` | none | node stats |
//! | `mesh_subscribe` | `"orders"` or `"heartbeat"` | subscription id (WebSocket only) |
//! | `mesh_unsubscribe` | subscription id | `bool` (WebSocket only) |
//!
//! ## Architecture
//!
//! ```text
//!   HTTP POST /  ──┐
//!                  ├──► router ──► MeshRpcBackend (node runtime)
//!   WS /ws ────────┘       │
//!                          └──► SubscriptionManager ──► one task per subscription
//!                                                        └──► connection outbound queue
//! ```

pub mod domain;
pub mod events;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod service;
pub mod ws;

#[cfg(test)]
mod testing;

pub use domain::config::{CorsConfig, RpcConfig};
pub use domain::error::{codes, ApiError, ApiResult, GatewayError};
pub use domain::types::{
    failure, start_of_utc_day, success, GetStatsResponse, SubscriptionNotification, SubscriptionTopic,
    HEARTBEAT_TOKEN, SUBSCRIPTION_METHOD,
};
pub use events::RpcLogEvent;
pub use middleware::create_cors_layer;
pub use ports::outbound::MeshRpcBackend;
pub use router::{handle_payload, AppState, Session};
pub use service::RpcServer;
pub use ws::{ConnectionId, SubscriptionId, SubscriptionManager, WebSocketHandler};
