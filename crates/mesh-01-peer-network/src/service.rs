//! # Peer Network Service
//!
//! Drives a [`PeerHost`] through bootstrap, operator-requested connections,
//! periodic peer exchange and order gossip.
//!
//! ## Gossip Flow
//!
//! ```text
//! remote peer ──Orders──→ handle_inbound
//!                             │ drop hashes already seen
//!                             ↓
//!                        OrderSink::receive_orders
//!                             │ keep accepted only
//!                             ↓
//!                        PeerHost::publish (all peers except sender)
//! ```

use crate::domain::address::{addr_infos_from_list, AddrInfo, AddressError};
use crate::domain::config::NetworkConfig;
use crate::domain::identity::{NetworkIdentity, PeerId};
use crate::domain::messages::{InboundOrders, OrderMessage};
use crate::domain::seen_cache::SeenOrderCache;
use crate::events::{NetworkError, NetworkLogEvent};
use crate::ports::inbound::PeerNetworkApi;
use crate::ports::outbound::{OrderSink, PeerHost};
use async_trait::async_trait;
use futures::future::join_all;
use mesh_telemetry::ORDERS_RECEIVED;
use parking_lot::Mutex;
use shared_types::{PeerInfo, SignedOrder};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

pub struct PeerNetwork {
    identity: NetworkIdentity,
    config: NetworkConfig,
    host: Arc<dyn PeerHost>,
    sink: Arc<dyn OrderSink>,
    seen: Mutex<SeenOrderCache>,
}

async fn bounded<F>(limit: Duration, fut: F) -> Result<(), NetworkError>
where
    F: Future<Output = Result<(), NetworkError>>,
{
    timeout(limit, fut).await.unwrap_or(Err(NetworkError::Timeout))
}

impl PeerNetwork {
    pub fn new(
        chain_id: u64,
        config: NetworkConfig,
        host: Arc<dyn PeerHost>,
        sink: Arc<dyn OrderSink>,
    ) -> Result<Self, NetworkError> {
        config.validate()?;
        Ok(Self {
            identity: NetworkIdentity::new(host.local_peer_id(), chain_id),
            seen: Mutex::new(SeenOrderCache::new(config.seen_cache_size)),
            config,
            host,
            sink,
        })
    }

    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    #[must_use]
    pub fn connected_peers(&self) -> Vec<PeerInfo> {
        self.host.connected_peers()
    }

    /// Dialable addresses of this node, each ending in `/p2p/<id>`.
    #[must_use]
    pub fn listen_addrs(&self) -> Vec<String> {
        self.host.listen_addrs()
    }

    /// Validate orders gossiped by `from` and relay the accepted ones.
    ///
    /// Returns the number of peers the relay reached.
    #[instrument(skip(self, inbound), fields(from = %inbound.from, orders = inbound.orders.len()))]
    pub async fn handle_inbound(&self, inbound: InboundOrders) -> Result<usize, NetworkError> {
        let total = inbound.orders.len();
        let fresh: Vec<SignedOrder> = {
            let mut seen = self.seen.lock();
            inbound
                .orders
                .into_iter()
                .filter(|order| seen.insert(order.hash()))
                .collect()
        };
        NetworkLogEvent::OrdersReceived {
            from: inbound.from.clone(),
            orders: total,
            fresh: fresh.len(),
        }
        .emit();
        if fresh.is_empty() {
            return Ok(0);
        }

        ORDERS_RECEIVED.with_label_values(&["p2p"]).inc_by(fresh.len() as f64);
        let response = self.sink.receive_orders(fresh).await?;
        let accepted: Vec<SignedOrder> = response.accepted.into_iter().map(|info| info.signed_order).collect();
        if accepted.is_empty() {
            return Ok(0);
        }
        self.publish(accepted, Some(&inbound.from)).await
    }

    async fn publish(&self, orders: Vec<SignedOrder>, exclude: Option<&PeerId>) -> Result<usize, NetworkError> {
        let count = orders.len();
        let peers = timeout(
            self.config.publish_timeout,
            self.host.publish(OrderMessage::new(orders), exclude),
        )
        .await
        .unwrap_or(Err(NetworkError::Timeout))?;
        NetworkLogEvent::OrdersShared { orders: count, peers }.emit();
        Ok(peers)
    }

    /// One peer-exchange round. Returns the number of new connections.
    pub async fn discover_once(&self) -> usize {
        let mut added = 0;
        for known in self.host.connected_peers() {
            if self.peer_count() >= self.config.max_peers {
                break;
            }
            let known_id = PeerId::from(known.id);
            let candidates = match timeout(self.config.connect_timeout, self.host.find_peers(&known_id)).await {
                Ok(Ok(candidates)) => candidates,
                Ok(Err(e)) => {
                    NetworkLogEvent::DiscoveryFailed {
                        peer_id: known_id,
                        error: e.to_string(),
                    }
                    .emit();
                    continue;
                }
                Err(_) => {
                    NetworkLogEvent::DiscoveryFailed {
                        peer_id: known_id,
                        error: NetworkError::Timeout.to_string(),
                    }
                    .emit();
                    continue;
                }
            };

            for candidate in candidates {
                if self.peer_count() >= self.config.max_peers {
                    return added;
                }
                let candidate_id = PeerId::from(candidate.id);
                if candidate_id == self.identity.peer_id || self.host.is_connected(&candidate_id) {
                    continue;
                }
                let result = match AddrInfo::from_parts(candidate_id.clone(), &candidate.addrs) {
                    Ok(info) => bounded(self.config.connect_timeout, self.host.connect(&info)).await,
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(()) => added += 1,
                    Err(e) => NetworkLogEvent::DiscoveryFailed {
                        peer_id: candidate_id,
                        error: e.to_string(),
                    }
                    .emit(),
                }
            }
        }
        if added > 0 {
            debug!(added, peers = self.peer_count(), "discovery round connected new peers");
        }
        added
    }

    /// Consume gossip delivered by the host until shutdown.
    pub async fn run_gossip(self: Arc<Self>, mut inbound: mpsc::Receiver<InboundOrders>, mut shutdown: watch::Receiver<bool>) {
        info!(topic = %self.identity.topic(), "gossip loop started");
        loop {
            tokio::select! {
                received = inbound.recv() => {
                    let Some(received) = received else { break };
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = this.handle_inbound(received).await {
                            warn!(error = %e, "failed to handle gossiped orders");
                        }
                    });
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("gossip loop stopped");
    }

    /// Run peer exchange every `discovery_interval` until shutdown.
    pub async fn run_discovery(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.discovery_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.discover_once().await;
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}

#[async_trait]
impl PeerNetworkApi for PeerNetwork {
    #[instrument(skip(self))]
    async fn bootstrap(&self) -> Result<usize, NetworkError> {
        if !self.config.use_bootstrap_list {
            return Ok(0);
        }
        let infos: Vec<AddrInfo> = addr_infos_from_list(&self.config.bootstrap_list)?
            .into_iter()
            .filter(|info| info.peer_id != self.identity.peer_id)
            .collect();
        NetworkLogEvent::BootstrapStarted { peers: infos.len() }.emit();

        let deadline = Instant::now() + self.config.connect_timeout;
        let attempts = infos.iter().map(|info| async move {
            let result = timeout_at(deadline, self.host.connect(info))
                .await
                .unwrap_or(Err(NetworkError::Timeout));
            if let Err(e) = &result {
                NetworkLogEvent::BootstrapPeerFailed {
                    peer_id: info.peer_id.clone(),
                    error: e.to_string(),
                }
                .emit();
            }
            result.is_ok()
        });
        let connected = join_all(attempts).await.into_iter().filter(|ok| *ok).count();

        tokio::time::sleep(self.config.bootstrap_grace).await;
        NetworkLogEvent::BootstrapComplete {
            attempted: infos.len(),
            connected,
        }
        .emit();
        Ok(connected)
    }

    #[instrument(skip(self), fields(peer_id = %peer.id))]
    async fn add_peer(&self, peer: PeerInfo) -> Result<(), NetworkError> {
        if peer.id.is_empty() {
            return Err(AddressError::MissingComponent("peer id").into());
        }
        let info = AddrInfo::from_parts(PeerId::from(peer.id), &peer.addrs)?;
        if info.peer_id == self.identity.peer_id {
            return Err(NetworkError::Handshake("refusing to dial self".into()));
        }
        bounded(self.config.connect_timeout, self.host.connect(&info)).await
    }

    async fn share_orders(&self, orders: Vec<SignedOrder>) -> Result<usize, NetworkError> {
        if orders.is_empty() {
            return Ok(0);
        }
        {
            let mut seen = self.seen.lock();
            for order in &orders {
                seen.insert(order.hash());
            }
        }
        self.publish(orders, None).await
    }

    fn peer_count(&self) -> usize {
        self.host.connected_peers().len()
    }

    fn identity(&self) -> &NetworkIdentity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use shared_types::testing::TestOrderBuilder;
    use shared_types::{
        Address, OrderHash, OrderInfo, RejectedOrderCode, RejectedOrderInfo, ValidationResponse, U256,
    };
    use std::collections::{HashMap, HashSet};

    struct MockPeerHost {
        id: PeerId,
        reachable: RwLock<HashSet<PeerId>>,
        hanging: RwLock<HashSet<PeerId>>,
        connected: RwLock<Vec<PeerInfo>>,
        dialed: RwLock<Vec<PeerId>>,
        published: RwLock<Vec<(OrderMessage, Option<PeerId>)>>,
        directory: RwLock<HashMap<PeerId, Vec<PeerInfo>>>,
    }

    impl MockPeerHost {
        fn new(id: &str) -> Self {
            Self {
                id: PeerId::from(id),
                reachable: RwLock::new(HashSet::new()),
                hanging: RwLock::new(HashSet::new()),
                connected: RwLock::new(Vec::new()),
                dialed: RwLock::new(Vec::new()),
                published: RwLock::new(Vec::new()),
                directory: RwLock::new(HashMap::new()),
            }
        }

        fn reachable(&self, id: &str) {
            self.reachable.write().insert(PeerId::from(id));
        }
    }

    #[async_trait]
    impl PeerHost for MockPeerHost {
        fn local_peer_id(&self) -> PeerId {
            self.id.clone()
        }

        fn listen_addrs(&self) -> Vec<String> {
            vec![format!("/ip4/127.0.0.1/tcp/60558/p2p/{}", self.id)]
        }

        async fn connect(&self, info: &AddrInfo) -> Result<(), NetworkError> {
            self.dialed.write().push(info.peer_id.clone());
            if self.hanging.read().contains(&info.peer_id) {
                std::future::pending::<()>().await;
            }
            if self.is_connected(&info.peer_id) {
                return Ok(());
            }
            if !self.reachable.read().contains(&info.peer_id) {
                return Err(NetworkError::Io("connection refused".into()));
            }
            self.connected.write().push(PeerInfo {
                id: info.peer_id.to_string(),
                addrs: info.addrs.iter().map(ToString::to_string).collect(),
            });
            Ok(())
        }

        fn is_connected(&self, peer: &PeerId) -> bool {
            self.connected.read().iter().any(|p| p.id == peer.as_str())
        }

        fn connected_peers(&self) -> Vec<PeerInfo> {
            self.connected.read().clone()
        }

        async fn publish(&self, message: OrderMessage, exclude: Option<&PeerId>) -> Result<usize, NetworkError> {
            let reached = self
                .connected
                .read()
                .iter()
                .filter(|p| exclude.map_or(true, |e| p.id != e.as_str()))
                .count();
            self.published.write().push((message, exclude.cloned()));
            Ok(reached)
        }

        async fn find_peers(&self, peer: &PeerId) -> Result<Vec<PeerInfo>, NetworkError> {
            self.directory
                .read()
                .get(peer)
                .cloned()
                .ok_or_else(|| NetworkError::NotConnected(peer.clone()))
        }
    }

    #[derive(Default)]
    struct MockSink {
        rejected: RwLock<HashSet<OrderHash>>,
        received: RwLock<Vec<Vec<SignedOrder>>>,
    }

    #[async_trait]
    impl OrderSink for MockSink {
        async fn receive_orders(&self, orders: Vec<SignedOrder>) -> Result<ValidationResponse, NetworkError> {
            self.received.write().push(orders.clone());
            let rejected = self.rejected.read();
            let mut response = ValidationResponse::default();
            for order in orders {
                if rejected.contains(&order.hash()) {
                    response
                        .rejected
                        .push(RejectedOrderInfo::new(order, RejectedOrderCode::OrderHasInvalidSignature));
                } else {
                    response.accepted.push(OrderInfo::new(order, U256::from(1u64)));
                }
            }
            Ok(response)
        }
    }

    fn order(salt: u64) -> SignedOrder {
        TestOrderBuilder::new(1337, Address([0x48; 20]), 1, Address([1; 20]), Address([2; 20]))
            .salt(salt)
            .build()
    }

    fn test_config(bootstrap_list: Vec<String>) -> NetworkConfig {
        NetworkConfig {
            bootstrap_list,
            connect_timeout: Duration::from_millis(200),
            bootstrap_grace: Duration::from_millis(10),
            ..NetworkConfig::default()
        }
    }

    fn network(host: Arc<MockPeerHost>, sink: Arc<MockSink>, config: NetworkConfig) -> PeerNetwork {
        PeerNetwork::new(1337, config, host, sink).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_tolerates_unreachable_peer() {
        let host = Arc::new(MockPeerHost::new("self"));
        host.reachable("good");
        let config = test_config(vec![
            "/ip4/10.0.0.1/tcp/4001/p2p/bad".into(),
            "/ip4/10.0.0.2/tcp/4001/p2p/good".into(),
        ]);
        let net = network(host.clone(), Arc::default(), config);

        assert_eq!(net.bootstrap().await.unwrap(), 1);
        assert_eq!(net.peer_count(), 1);
        assert_eq!(host.dialed.read().len(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_skips_self_and_groups_addresses() {
        let host = Arc::new(MockPeerHost::new("self"));
        host.reachable("good");
        let config = test_config(vec![
            "/ip4/10.0.0.9/tcp/4001/p2p/self".into(),
            "/ip4/10.0.0.2/tcp/4001/p2p/good".into(),
            "/ip4/10.0.0.2/tcp/4002/ws/p2p/good".into(),
        ]);
        let net = network(host.clone(), Arc::default(), config);

        assert_eq!(net.bootstrap().await.unwrap(), 1);
        assert_eq!(*host.dialed.read(), vec![PeerId::from("good")]);
    }

    #[tokio::test]
    async fn test_bootstrap_timeout_is_shared() {
        let host = Arc::new(MockPeerHost::new("self"));
        host.reachable("good");
        host.hanging.write().insert(PeerId::from("slow"));
        let config = test_config(vec![
            "/ip4/10.0.0.1/tcp/4001/p2p/slow".into(),
            "/ip4/10.0.0.2/tcp/4001/p2p/good".into(),
        ]);
        let net = network(host, Arc::default(), config);

        let started = std::time::Instant::now();
        assert_eq!(net.bootstrap().await.unwrap(), 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_bootstrap_disabled() {
        let host = Arc::new(MockPeerHost::new("self"));
        let config = NetworkConfig {
            use_bootstrap_list: false,
            ..test_config(vec![])
        };
        let net = network(host.clone(), Arc::default(), config);
        assert_eq!(net.bootstrap().await.unwrap(), 0);
        assert!(host.dialed.read().is_empty());
    }

    #[tokio::test]
    async fn test_add_peer_reports_failures() {
        let host = Arc::new(MockPeerHost::new("self"));
        host.reachable("good");
        let net = network(host.clone(), Arc::default(), test_config(vec![]));

        let good = PeerInfo {
            id: "good".into(),
            addrs: vec!["/ip4/127.0.0.1/tcp/9000".into()],
        };
        net.add_peer(good).await.unwrap();
        assert_eq!(net.peer_count(), 1);

        let unreachable = PeerInfo {
            id: "gone".into(),
            addrs: vec!["/ip4/127.0.0.1/tcp/9001".into()],
        };
        assert!(matches!(net.add_peer(unreachable).await, Err(NetworkError::Io(_))));

        let no_addrs = PeerInfo {
            id: "good".into(),
            addrs: vec![],
        };
        assert_eq!(
            net.add_peer(no_addrs).await,
            Err(NetworkError::Address(AddressError::Empty))
        );

        let garbage = PeerInfo {
            id: "good".into(),
            addrs: vec!["not an address".into()],
        };
        assert!(matches!(net.add_peer(garbage).await, Err(NetworkError::Address(_))));
    }

    #[tokio::test]
    async fn test_gossip_relays_only_accepted_orders() {
        let host = Arc::new(MockPeerHost::new("self"));
        let sink = Arc::new(MockSink::default());
        let (good, bad) = (order(1), order(2));
        sink.rejected.write().insert(bad.hash());
        let net = network(host.clone(), sink.clone(), test_config(vec![]));

        let from = PeerId::from("sender");
        net.handle_inbound(InboundOrders {
            from: from.clone(),
            orders: vec![good.clone(), bad],
        })
        .await
        .unwrap();

        let published = host.published.read();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0.orders, vec![good]);
        assert_eq!(published[0].1, Some(from));
    }

    #[tokio::test]
    async fn test_gossip_suppresses_duplicates() {
        let host = Arc::new(MockPeerHost::new("self"));
        let sink = Arc::new(MockSink::default());
        let net = network(host.clone(), sink.clone(), test_config(vec![]));

        for _ in 0..2 {
            net.handle_inbound(InboundOrders {
                from: PeerId::from("a"),
                orders: vec![order(1)],
            })
            .await
            .unwrap();
        }
        assert_eq!(sink.received.read().len(), 1);
        assert_eq!(host.published.read().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_gossip_is_not_relayed() {
        let host = Arc::new(MockPeerHost::new("self"));
        let sink = Arc::new(MockSink::default());
        let bad = order(3);
        sink.rejected.write().insert(bad.hash());
        let net = network(host.clone(), sink, test_config(vec![]));

        let relayed = net
            .handle_inbound(InboundOrders {
                from: PeerId::from("a"),
                orders: vec![bad],
            })
            .await
            .unwrap();
        assert_eq!(relayed, 0);
        assert!(host.published.read().is_empty());
    }

    #[tokio::test]
    async fn test_shared_orders_are_not_revalidated_when_echoed() {
        let host = Arc::new(MockPeerHost::new("self"));
        let sink = Arc::new(MockSink::default());
        let net = network(host.clone(), sink.clone(), test_config(vec![]));

        net.share_orders(vec![order(5)]).await.unwrap();
        assert_eq!(host.published.read()[0].1, None);

        net.handle_inbound(InboundOrders {
            from: PeerId::from("echo"),
            orders: vec![order(5)],
        })
        .await
        .unwrap();
        assert!(sink.received.read().is_empty());
    }

    #[tokio::test]
    async fn test_discovery_dials_new_peers_up_to_limit() {
        let host = Arc::new(MockPeerHost::new("self"));
        for id in ["known", "x", "y"] {
            host.reachable(id);
        }
        host.connected.write().push(PeerInfo {
            id: "known".into(),
            addrs: vec!["/ip4/10.0.0.1/tcp/1".into()],
        });
        let candidates = ["self", "known", "x", "y"]
            .iter()
            .enumerate()
            .map(|(i, id)| PeerInfo {
                id: (*id).into(),
                addrs: vec![format!("/ip4/10.0.0.{}/tcp/1", i + 2)],
            })
            .collect();
        host.directory.write().insert(PeerId::from("known"), candidates);

        let config = NetworkConfig {
            max_peers: 2,
            ..test_config(vec![])
        };
        let net = network(host.clone(), Arc::default(), config);

        assert_eq!(net.discover_once().await, 1);
        assert_eq!(net.peer_count(), 2);
        assert!(!host.dialed.read().contains(&PeerId::from("self")));
        assert!(!host.dialed.read().contains(&PeerId::from("y")));
    }

    #[tokio::test]
    async fn test_gossip_loop_stops_on_shutdown() {
        let host = Arc::new(MockPeerHost::new("self"));
        let sink = Arc::new(MockSink::default());
        let net = Arc::new(network(host.clone(), sink.clone(), test_config(vec![])));
        let (tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(&net).run_gossip(rx, shutdown_rx));

        tx.send(InboundOrders {
            from: PeerId::from("a"),
            orders: vec![order(9)],
        })
        .await
        .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while host.published.read().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timeout");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("timeout")
            .unwrap();
    }
}
