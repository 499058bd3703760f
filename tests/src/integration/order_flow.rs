//! # Order Flow
//!
//! A client submits orders over RPC, pages through them under a snapshot
//! and follows their state changes on an order subscription while the
//! ledger fills and cancels them.

use super::support::{eventually, local_config, order, TestNode, WsClient};
use serde_json::{json, Value};
use shared_types::U256;

#[tokio::test]
async fn test_add_orders_partitions_and_stats_count() {
    let node = TestNode::start(local_config()).await;
    let funded = order(1);
    node.fund(&funded);
    let mut tampered = order(2);
    tampered.salt = U256::from(999u64);

    let result = node.result("mesh_addOrders", json!([[funded.clone(), tampered]])).await;
    assert_eq!(result["accepted"].as_array().unwrap().len(), 1);
    assert_eq!(result["accepted"][0]["orderHash"], json!(funded.hash()));
    assert_eq!(result["rejected"].as_array().unwrap().len(), 1);
    assert_eq!(result["rejected"][0]["status"]["code"], "OrderHasInvalidSignature");

    let stats = node.result("mesh_getStats", json!([])).await;
    assert_eq!(stats["numOrders"], 1);
    assert_eq!(stats["version"], "development");
    assert_eq!(stats["ethereumChainID"], 1337);
    assert_eq!(stats["rendezvous"], "/0x-mesh/network/1337/version/1");
    assert_eq!(stats["pubSubTopic"], "/0x-orders/network/1337/version/1");
    assert_eq!(stats["peerID"], node.peer_id());
    assert_eq!(
        stats["maxExpirationTime"],
        "115792089237316195423570985008687907853269984665640564039457584007913129639935"
    );
    assert!(stats["startOfCurrentUTCDay"].as_str().unwrap().ends_with("T00:00:00Z"));

    node.stop().await;
}

#[tokio::test]
async fn test_unfunded_order_is_rejected() {
    let node = TestNode::start(local_config()).await;
    let result = node.result("mesh_addOrders", json!([[order(1)]])).await;
    assert_eq!(result["accepted"], json!([]));
    assert_eq!(result["rejected"][0]["status"]["code"], "OrderUnfunded");
    node.stop().await;
}

#[tokio::test]
async fn test_get_orders_pages_a_frozen_snapshot() {
    let node = TestNode::start(local_config()).await;
    let orders: Vec<_> = (1..=5).map(order).collect();
    node.fund(&orders[0]);
    node.result("mesh_addOrders", json!([orders])).await;

    let first = node.result("mesh_getOrders", json!([0, 2, ""])).await;
    let snapshot_id = first["snapshotID"].as_str().unwrap().to_string();
    assert_eq!(first["ordersInfos"].as_array().unwrap().len(), 2);

    // Admitted after the snapshot was taken.
    let late = order(6);
    let late_hash = json!(late.hash()).as_str().unwrap().to_string();
    node.result("mesh_addOrders", json!([[late]])).await;

    let mut seen = Vec::new();
    for page in 0..4 {
        let response = node
            .result("mesh_getOrders", json!([page, 2, snapshot_id]))
            .await;
        assert_eq!(response["snapshotID"], snapshot_id.as_str());
        assert_eq!(response["snapshotTimestamp"], first["snapshotTimestamp"]);
        for info in response["ordersInfos"].as_array().unwrap() {
            seen.push(info["orderHash"].as_str().unwrap().to_string());
        }
    }
    assert_eq!(seen.len(), 5);
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted);
    assert!(!seen.contains(&late_hash));

    let fresh = node.result("mesh_getOrders", json!([0, 10])).await;
    assert_ne!(fresh["snapshotID"], snapshot_id.as_str());
    assert_eq!(fresh["ordersInfos"].as_array().unwrap().len(), 6);

    let bad = node.call("mesh_getOrders", json!([0, 0, ""])).await;
    assert_eq!(bad["error"]["code"], -32602);

    node.stop().await;
}

#[tokio::test]
async fn test_subscription_follows_ledger() {
    let node = TestNode::start(local_config()).await;
    let mut ws = WsClient::connect(&node.ws_url()).await;
    let subscribed = ws.call("mesh_subscribe", json!(["orders"])).await;
    let subscription = subscribed["result"].as_str().unwrap().to_string();

    let placed = order(7);
    node.fund(&placed);
    let added = ws.call("mesh_addOrders", json!([[placed.clone()]])).await;
    assert_eq!(added["result"]["accepted"].as_array().unwrap().len(), 1);

    let note = ws.notification().await;
    assert_eq!(note["method"], "mesh_subscription");
    assert_eq!(note["params"]["subscription"], subscription.as_str());
    assert_eq!(note["params"]["result"][0]["endState"], "ADDED");

    node.ledger.fill_order(&placed, U256::from(500u64));
    node.ledger.mine_block();
    let filled = ws.notification().await;
    let event = &filled["params"]["result"][0];
    assert_eq!(event["endState"], "FILLED");
    assert_eq!(event["fillableTakerAssetAmount"], "1500");
    assert_eq!(event["contractEvents"].as_array().unwrap().len(), 1);

    node.ledger.cancel_order(&placed);
    node.ledger.mine_block();
    let cancelled = ws.notification().await;
    assert_eq!(cancelled["params"]["result"][0]["endState"], "CANCELLED");

    let node_ref = &node;
    eventually("order to leave the live set", move || async move {
        node_ref.result("mesh_getStats", json!([])).await["numOrders"] == 0
    })
    .await;

    let unsubscribed = ws.call("mesh_unsubscribe", json!([subscription])).await;
    assert_eq!(unsubscribed["result"], true);
    node.stop().await;
}

#[tokio::test]
async fn test_heartbeat_subscription() {
    let node = TestNode::start(local_config()).await;
    let mut ws = WsClient::connect(&node.ws_url()).await;
    let subscribed = ws.call("mesh_subscribe", json!(["heartbeat"])).await;
    let id = subscribed["result"].clone();

    for _ in 0..2 {
        let tick = ws.notification().await;
        assert_eq!(tick["params"]["subscription"], id);
        assert_eq!(tick["params"]["result"], "tick");
    }
    node.stop().await;
}

#[tokio::test]
async fn test_http_rejects_subscriptions_and_unknown_methods() {
    let node = TestNode::start(local_config()).await;
    let subscribe = node.call("mesh_subscribe", json!(["orders"])).await;
    assert!(subscribe["error"]["code"].as_i64().is_some());
    let unknown = node.call("mesh_mine", Value::Null).await;
    assert_eq!(unknown["error"]["code"], -32601);
    node.stop().await;
}
