//! # Peer Flow
//!
//! Nodes find each other through the bootstrap list, `mesh_addPeer` and
//! peer exchange, then gossip admitted orders to each other.

use super::support::{eventually, local_config, order, TestNode};
use serde_json::json;

async fn peers_of(node: &TestNode) -> u64 {
    node.result("mesh_getStats", json!([])).await["numPeers"]
        .as_u64()
        .unwrap_or_default()
}

async fn wait_for_peers(node: &TestNode, peers: u64) {
    eventually("peer connections", move || async move { peers_of(node).await >= peers }).await;
}

/// Start a node whose bootstrap list is `entries`.
async fn bootstrapped(entries: Vec<String>) -> TestNode {
    let mut config = local_config();
    config.network.use_bootstrap_list = true;
    config.network.bootstrap_list = entries;
    TestNode::start(config).await
}

#[tokio::test]
async fn test_bootstrap_survives_unreachable_peer() {
    let a = TestNode::start(local_config()).await;
    let b = bootstrapped(vec![
        "/ip4/127.0.0.1/tcp/1/p2p/deadbeef".to_string(),
        a.p2p_addr(),
    ])
    .await;

    wait_for_peers(&b, 1).await;
    wait_for_peers(&a, 1).await;

    b.stop().await;
    a.stop().await;
}

#[tokio::test]
async fn test_orders_gossip_to_peers() {
    let a = TestNode::start(local_config()).await;
    let b = bootstrapped(vec![a.p2p_addr()]).await;
    wait_for_peers(&b, 1).await;
    wait_for_peers(&a, 1).await;

    let shared = order(42);
    a.fund(&shared);
    b.fund(&shared);
    let result = a.result("mesh_addOrders", json!([[shared.clone()]])).await;
    assert_eq!(result["accepted"].as_array().unwrap().len(), 1);

    let b_ref = &b;
    eventually("gossiped order on the peer", move || async move {
        b_ref.result("mesh_getStats", json!([])).await["numOrders"] == 1
    })
    .await;
    let page = b.result("mesh_getOrders", json!([0, 10])).await;
    assert_eq!(page["ordersInfos"][0]["orderHash"], json!(shared.hash()));

    b.stop().await;
    a.stop().await;
}

#[tokio::test]
async fn test_peer_validates_gossip_against_its_own_ledger() {
    let a = TestNode::start(local_config()).await;
    let b = bootstrapped(vec![a.p2p_addr()]).await;
    wait_for_peers(&b, 1).await;
    wait_for_peers(&a, 1).await;

    // Funded only where it was submitted.
    let local_only = order(43);
    a.fund(&local_only);
    a.result("mesh_addOrders", json!([[local_only]])).await;

    let marker = order(44);
    a.fund(&marker);
    b.fund(&marker);
    a.result("mesh_addOrders", json!([[marker]])).await;

    let b_ref = &b;
    eventually("marker order on the peer", move || async move {
        b_ref.result("mesh_getStats", json!([])).await["numOrders"] == 1
    })
    .await;
    assert_eq!(a.result("mesh_getStats", json!([])).await["numOrders"], 2);

    b.stop().await;
    a.stop().await;
}

#[tokio::test]
async fn test_add_peer_over_rpc() {
    let a = TestNode::start(local_config()).await;
    let b = TestNode::start(local_config()).await;

    let added = b
        .call("mesh_addPeer", json!([{"id": a.peer_id(), "addrs": [a.p2p_addr()]}]))
        .await;
    assert!(added.get("error").is_none(), "{added}");
    assert_eq!(added["result"], serde_json::Value::Null);
    wait_for_peers(&a, 1).await;

    let mismatched = b
        .call("mesh_addPeer", json!([{"id": "someone-else", "addrs": [a.p2p_addr()]}]))
        .await;
    assert_eq!(mismatched["error"]["code"], -32602);

    let malformed = b
        .call("mesh_addPeer", json!([{"id": "abc", "addrs": ["not-an-address"]}]))
        .await;
    assert_eq!(malformed["error"]["code"], -32602);

    let unreachable = b
        .call("mesh_addPeer", json!([{"id": "abc", "addrs": ["/ip4/127.0.0.1/tcp/1"]}]))
        .await;
    assert_eq!(unreachable["error"]["code"], -32000);

    b.stop().await;
    a.stop().await;
}

#[tokio::test]
async fn test_discovery_connects_peers_of_peers() {
    let a = TestNode::start(local_config()).await;
    let b = bootstrapped(vec![a.p2p_addr()]).await;
    wait_for_peers(&b, 1).await;

    let c = bootstrapped(vec![b.p2p_addr()]).await;
    wait_for_peers(&c, 2).await;
    wait_for_peers(&a, 2).await;

    c.stop().await;
    b.stop().await;
    a.stop().await;
}
