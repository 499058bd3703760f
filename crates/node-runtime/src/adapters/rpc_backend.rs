//! [`MeshRpcBackend`] over the watcher, snapshot store and peer network.
//!
//! Subsystem errors are translated to JSON-RPC errors here. Bad client
//! input becomes invalid params; everything else is an internal or server
//! error and is never a raw transport error from an unrelated peer.

use async_trait::async_trait;
use chrono::Utc;
use mesh_01_peer_network::{NetworkError, PeerNetworkApi};
use mesh_04_order_watcher::OrderWatcherApi;
use mesh_05_snapshot_store::{GetOrdersResponse, SnapshotApi, SnapshotError};
use mesh_06_rpc_gateway::{start_of_utc_day, ApiError, ApiResult, GetStatsResponse, MeshRpcBackend};
use shared_bus::Subscription;
use shared_types::{OrderEvent, PeerInfo, SignedOrder, ValidationResponse, U256};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct MeshBackend {
    version: String,
    max_expiration_time: U256,
    watcher: Arc<dyn OrderWatcherApi>,
    snapshots: Arc<dyn SnapshotApi>,
    network: Arc<dyn PeerNetworkApi>,
}

impl MeshBackend {
    pub fn new(
        version: impl Into<String>,
        max_expiration_time: U256,
        watcher: Arc<dyn OrderWatcherApi>,
        snapshots: Arc<dyn SnapshotApi>,
        network: Arc<dyn PeerNetworkApi>,
    ) -> Self {
        Self {
            version: version.into(),
            max_expiration_time,
            watcher,
            snapshots,
            network,
        }
    }
}

#[async_trait]
impl MeshRpcBackend for MeshBackend {
    async fn add_orders(&self, orders: Vec<SignedOrder>) -> ApiResult<ValidationResponse> {
        let response = self
            .watcher
            .add_orders(orders)
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;

        if !response.accepted.is_empty() {
            let accepted: Vec<SignedOrder> = response
                .accepted
                .iter()
                .map(|info| info.signed_order.clone())
                .collect();
            match self.network.share_orders(accepted).await {
                Ok(peers) => debug!(orders = response.accepted.len(), peers, "shared new orders"),
                Err(e) => warn!(error = %e, "failed to share new orders with peers"),
            }
        }
        Ok(response)
    }

    async fn get_orders(&self, page: usize, per_page: usize, snapshot_id: &str) -> ApiResult<GetOrdersResponse> {
        self.snapshots
            .get_orders(page, per_page, snapshot_id)
            .await
            .map_err(|e| match e {
                SnapshotError::InvalidPerPage { .. } => ApiError::invalid_params(e.to_string()),
                other => ApiError::internal(other.to_string()),
            })
    }

    async fn add_peer(&self, peer: PeerInfo) -> ApiResult<()> {
        self.network.add_peer(peer).await.map_err(|e| match e {
            NetworkError::Address(_) => ApiError::invalid_params(e.to_string()),
            other => ApiError::server_error(other.to_string()),
        })
    }

    async fn get_stats(&self) -> ApiResult<GetStatsResponse> {
        let stats = self
            .watcher
            .stats()
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let identity = self.network.identity();
        Ok(GetStatsResponse {
            version: self.version.clone(),
            pub_sub_topic: identity.topic(),
            rendezvous: identity.rendezvous(),
            peer_id: identity.peer_id.to_string(),
            ethereum_chain_id: identity.chain_id,
            latest_block: stats.latest_block,
            num_orders: stats.num_orders,
            num_peers: self.network.peer_count(),
            max_expiration_time: self.max_expiration_time,
            start_of_current_utc_day: start_of_utc_day(Utc::now()),
        })
    }

    fn subscribe_orders(&self) -> Subscription<Vec<OrderEvent>> {
        self.watcher.subscribe()
    }
}
