//! JSON-RPC envelopes and method payloads.
//!
//! Field names follow the mesh RPC wire format (`snapshotID`, `peerID`,
//! `startOfCurrentUTCDay`, ...), so renames here are part of the public
//! interface.

use crate::domain::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{u256_dec, LatestBlock, U256};

pub const JSONRPC_VERSION: &str = "2.0";

/// Method name carried by every subscription notification.
pub const SUBSCRIPTION_METHOD: &str = "mesh_subscription";

/// Literal delivered on each heartbeat.
pub const HEARTBEAT_TOKEN: &str = "tick";

/// Build a success response.
#[must_use]
pub fn success(id: Option<Value>, result: Value) -> Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// Build an error response.
#[must_use]
pub fn failure(id: Option<Value>, error: &ApiError) -> Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": error,
    })
}

/// Streams a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTopic {
    Orders,
    Heartbeat,
}

impl SubscriptionTopic {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTopic::Orders => "orders",
            SubscriptionTopic::Heartbeat => "heartbeat",
        }
    }
}

/// Server-initiated message on a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: SubscriptionParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: String,
    pub result: Value,
}

impl SubscriptionNotification {
    pub fn new(subscription: impl Into<String>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: SUBSCRIPTION_METHOD.to_string(),
            params: SubscriptionParams {
                subscription: subscription.into(),
                result,
            },
        }
    }
}

/// Point-in-time node summary returned by `mesh_getStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStatsResponse {
    pub version: String,
    pub pub_sub_topic: String,
    pub rendezvous: String,
    #[serde(rename = "peerID")]
    pub peer_id: String,
    #[serde(rename = "ethereumChainID")]
    pub ethereum_chain_id: u64,
    pub latest_block: LatestBlock,
    pub num_orders: usize,
    pub num_peers: usize,
    #[serde(with = "u256_dec")]
    pub max_expiration_time: U256,
    #[serde(rename = "startOfCurrentUTCDay")]
    pub start_of_current_utc_day: DateTime<Utc>,
}

/// Midnight UTC of the day containing `now`.
#[must_use]
pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_notification_shape() {
        let note = SubscriptionNotification::new("0x1", Value::String(HEARTBEAT_TOKEN.into()));
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "mesh_subscription",
                "params": {"subscription": "0x1", "result": "tick"}
            })
        );
    }

    #[test]
    fn test_stats_field_names() {
        let stats = GetStatsResponse {
            version: "development".into(),
            pub_sub_topic: "/0x-orders/network/1337/version/1".into(),
            rendezvous: "/0x-mesh/network/1337/version/1".into(),
            peer_id: "abc".into(),
            ethereum_chain_id: 1337,
            latest_block: LatestBlock::default(),
            num_orders: 2,
            num_peers: 1,
            max_expiration_time: U256::MAX,
            start_of_current_utc_day: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["peerID"], "abc");
        assert_eq!(json["ethereumChainID"], 1337);
        assert_eq!(json["pubSubTopic"], "/0x-orders/network/1337/version/1");
        assert_eq!(
            json["maxExpirationTime"],
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
        assert_eq!(json["startOfCurrentUTCDay"], "2024-05-01T00:00:00Z");
        assert_eq!(serde_json::from_value::<GetStatsResponse>(json).unwrap(), stats);
    }

    #[test]
    fn test_start_of_utc_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 17, 42, 9).unwrap();
        assert_eq!(start_of_utc_day(now), Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_topic_names() {
        let topic: SubscriptionTopic = serde_json::from_str("\"heartbeat\"").unwrap();
        assert_eq!(topic, SubscriptionTopic::Heartbeat);
        assert!(serde_json::from_str::<SubscriptionTopic>("\"blocks\"").is_err());
    }
}
