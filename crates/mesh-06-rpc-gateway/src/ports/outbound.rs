//! # Outbound Ports
//!
//! Everything the gateway serves comes from a [`MeshRpcBackend`]. The node
//! runtime implements it over the watcher, snapshot store and peer network,
//! mapping their errors to [`ApiError`]s for the caller.

use crate::domain::error::ApiResult;
use crate::domain::types::GetStatsResponse;
use async_trait::async_trait;
use mesh_05_snapshot_store::GetOrdersResponse;
use shared_bus::Subscription;
use shared_types::{OrderEvent, PeerInfo, SignedOrder, ValidationResponse};

#[async_trait]
pub trait MeshRpcBackend: Send + Sync {
    /// Validate and admit orders; accepted ones are also shared with peers.
    async fn add_orders(&self, orders: Vec<SignedOrder>) -> ApiResult<ValidationResponse>;

    async fn get_orders(&self, page: usize, per_page: usize, snapshot_id: &str) -> ApiResult<GetOrdersResponse>;

    async fn add_peer(&self, peer: PeerInfo) -> ApiResult<()>;

    async fn get_stats(&self) -> ApiResult<GetStatsResponse>;

    /// Subscribe to order event batches. Dropping the handle unsubscribes.
    fn subscribe_orders(&self) -> Subscription<Vec<OrderEvent>>;
}
