//! WebSocket transport and subscription fan-out.

pub mod handler;
pub mod subscriptions;

pub use handler::WebSocketHandler;
pub use subscriptions::{ConnectionId, SubscriptionId, SubscriptionManager};
