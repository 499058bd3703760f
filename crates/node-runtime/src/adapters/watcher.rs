//! Watcher-backed adapters for the peer network and the snapshot store.

use async_trait::async_trait;
use mesh_01_peer_network::{NetworkError, OrderSink};
use mesh_04_order_watcher::OrderWatcherApi;
use mesh_05_snapshot_store::{OrderSource, SnapshotError};
use shared_types::{OrderHash, OrderInfo, SignedOrder, ValidationResponse};
use std::sync::Arc;

/// Orders gossiped by peers go through the same admission path as local
/// submissions.
pub struct WatcherOrderSink {
    watcher: Arc<dyn OrderWatcherApi>,
}

impl WatcherOrderSink {
    pub fn new(watcher: Arc<dyn OrderWatcherApi>) -> Self {
        Self { watcher }
    }
}

#[async_trait]
impl OrderSink for WatcherOrderSink {
    async fn receive_orders(&self, orders: Vec<SignedOrder>) -> Result<ValidationResponse, NetworkError> {
        self.watcher
            .add_orders(orders)
            .await
            .map_err(|e| NetworkError::Sink(e.to_string()))
    }
}

/// Snapshot membership and live amounts read from the watcher.
pub struct WatcherOrderSource {
    watcher: Arc<dyn OrderWatcherApi>,
}

impl WatcherOrderSource {
    pub fn new(watcher: Arc<dyn OrderWatcherApi>) -> Self {
        Self { watcher }
    }
}

#[async_trait]
impl OrderSource for WatcherOrderSource {
    async fn current_hashes(&self) -> Result<Vec<OrderHash>, SnapshotError> {
        self.watcher
            .current_hashes()
            .await
            .map_err(|e| SnapshotError::Source(e.to_string()))
    }

    async fn order_infos(&self, hashes: Vec<OrderHash>) -> Result<Vec<OrderInfo>, SnapshotError> {
        self.watcher
            .order_infos(hashes)
            .await
            .map_err(|e| SnapshotError::Source(e.to_string()))
    }
}
