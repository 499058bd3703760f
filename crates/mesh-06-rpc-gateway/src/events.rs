//! Structured log records of the RPC gateway.

use crate::domain::types::SubscriptionTopic;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcLogEvent {
    Started { addr: String },
    RequestFailed { method: String, code: i32, message: String },
    ConnectionOpened { connection_id: u64 },
    ConnectionClosed { connection_id: u64, subscriptions: usize },
    SubscriptionOpened { id: String, topic: SubscriptionTopic },
    SubscriptionEnded { id: String, topic: SubscriptionTopic },
    Stopped,
}

impl RpcLogEvent {
    pub fn emit(&self) {
        match self {
            RpcLogEvent::Started { addr } => info!(address = %addr, "started RPC server"),
            RpcLogEvent::RequestFailed { method, code, message } => {
                debug!(method = %method, code, message = %message, "RPC request failed")
            }
            RpcLogEvent::ConnectionOpened { connection_id } => {
                debug!(connection_id, "WebSocket connection opened")
            }
            RpcLogEvent::ConnectionClosed {
                connection_id,
                subscriptions,
            } => debug!(connection_id, subscriptions, "WebSocket connection closed"),
            RpcLogEvent::SubscriptionOpened { id, topic } => {
                debug!(subscription_id = %id, topic = topic.as_str(), "subscription opened")
            }
            RpcLogEvent::SubscriptionEnded { id, topic } => {
                warn!(subscription_id = %id, topic = topic.as_str(), "subscription ended by server")
            }
            RpcLogEvent::Stopped => info!("RPC server stopped"),
        }
    }
}
