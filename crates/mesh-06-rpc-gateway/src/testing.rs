//! Test doubles shared by the gateway's unit tests.

use crate::domain::config::RpcConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::domain::types::GetStatsResponse;
use crate::ports::outbound::MeshRpcBackend;
use crate::router::AppState;
use crate::ws::subscriptions::SubscriptionManager;
use async_trait::async_trait;
use chrono::Utc;
use mesh_05_snapshot_store::{GetOrdersResponse, SnapshotId};
use parking_lot::RwLock;
use shared_bus::{BroadcastRegistry, EventPublisher, Subscription};
use shared_types::testing::TestOrderBuilder;
use shared_types::{Address, LatestBlock, OrderEvent, OrderInfo, PeerInfo, SignedOrder, ValidationResponse, U256};
use std::sync::Arc;

pub(crate) fn sample_order(salt: u64) -> SignedOrder {
    TestOrderBuilder::new(1337, Address([0x48; 20]), 1, Address([1; 20]), Address([2; 20]))
        .salt(salt)
        .build()
}

#[derive(Default)]
pub(crate) struct MockBackend {
    pub added: RwLock<Vec<SignedOrder>>,
    pub page_requests: RwLock<Vec<(usize, usize, String)>>,
    pub bus: BroadcastRegistry<Vec<OrderEvent>>,
}

impl MockBackend {
    pub fn publish_empty_batch(&self) {
        self.bus.publish(Vec::new());
    }
}

#[async_trait]
impl MeshRpcBackend for MockBackend {
    async fn add_orders(&self, orders: Vec<SignedOrder>) -> ApiResult<ValidationResponse> {
        self.added.write().extend(orders.iter().cloned());
        Ok(ValidationResponse {
            accepted: orders
                .into_iter()
                .map(|order| OrderInfo::new(order, U256::from(1_000u64)))
                .collect(),
            rejected: Vec::new(),
        })
    }

    async fn get_orders(&self, page: usize, per_page: usize, snapshot_id: &str) -> ApiResult<GetOrdersResponse> {
        self.page_requests
            .write()
            .push((page, per_page, snapshot_id.to_string()));
        Ok(GetOrdersResponse {
            snapshot_id: SnapshotId::new(),
            snapshot_timestamp: Utc::now(),
            orders_infos: Vec::new(),
        })
    }

    async fn add_peer(&self, peer: PeerInfo) -> ApiResult<()> {
        if peer.addrs.is_empty() {
            return Err(ApiError::invalid_params("peer has no addresses"));
        }
        Ok(())
    }

    async fn get_stats(&self) -> ApiResult<GetStatsResponse> {
        Ok(GetStatsResponse {
            version: "development".into(),
            pub_sub_topic: "/0x-orders/network/1337/version/1".into(),
            rendezvous: "/0x-mesh/network/1337/version/1".into(),
            peer_id: "mock".into(),
            ethereum_chain_id: 1337,
            latest_block: LatestBlock::default(),
            num_orders: self.added.read().len(),
            num_peers: 0,
            max_expiration_time: U256::MAX,
            start_of_current_utc_day: crate::domain::types::start_of_utc_day(Utc::now()),
        })
    }

    fn subscribe_orders(&self) -> Subscription<Vec<OrderEvent>> {
        self.bus.subscribe()
    }
}

pub(crate) fn test_state() -> (AppState, Arc<MockBackend>) {
    test_state_with(RpcConfig::default())
}

pub(crate) fn test_state_with(config: RpcConfig) -> (AppState, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::default());
    let state = AppState {
        backend: backend.clone(),
        subscriptions: Arc::new(SubscriptionManager::new(
            config.max_subscriptions_per_connection,
            config.heartbeat_interval,
        )),
        config: Arc::new(config),
    };
    (state, backend)
}
