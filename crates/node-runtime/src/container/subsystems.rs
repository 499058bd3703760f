//! # Subsystem Container
//!
//! Builds every subsystem in dependency order and wires each outbound port
//! to its adapter. Nothing is spawned here: the long-running loops are
//! handed back in [`SubsystemLoops`] for the runtime to schedule.
//!
//! ```text
//! ledger ──► validator ──► watcher ◄── head poller
//!                             │
//!              ┌──────────────┼───────────────┐
//!              ▼              ▼               ▼
//!        snapshot store   peer network    RPC backend
//!        (OrderSource)    (OrderSink)     (MeshRpcBackend)
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::info;

use mesh_01_peer_network::{InboundOrders, NetworkIdentity, PeerId, PeerNetwork, PeerNetworkApi, TcpPeerHost};
use mesh_02_ethereum::{ContractAddresses, LedgerClient};
use mesh_03_order_validation::{OrderValidator, SystemTimeSource};
use mesh_04_order_watcher::{HeadPoller, OrderWatcher, OrderWatcherApi, WatcherHandle};
use mesh_05_snapshot_store::SnapshotStore;
use mesh_06_rpc_gateway::RpcServer;
use shared_bus::BroadcastRegistry;

use crate::adapters::{MeshBackend, WatcherOrderSink, WatcherOrderSource};
use crate::container::config::NodeConfig;

/// Handles to every running subsystem.
pub struct SubsystemContainer {
    pub config: NodeConfig,
    pub contracts: ContractAddresses,
    pub ledger: Arc<dyn LedgerClient>,
    pub watcher: WatcherHandle,
    pub snapshots: Arc<SnapshotStore>,
    pub network: Arc<PeerNetwork>,
    /// Address the peer listener is bound to.
    pub p2p_addr: SocketAddr,
    /// Address the RPC listener is bound to.
    pub rpc_addr: SocketAddr,
}

/// Long-running loops built alongside the container, not yet spawned.
pub struct SubsystemLoops {
    pub watcher: OrderWatcher,
    pub head_poller: HeadPoller,
    pub gossip: mpsc::Receiver<InboundOrders>,
    pub rpc: RpcServer,
    pub rpc_listener: TcpListener,
}

impl SubsystemContainer {
    /// Build and bind every subsystem. Binding the peer and RPC listeners
    /// happens here so that address conflicts fail startup.
    pub async fn build(
        config: NodeConfig,
        ledger: Arc<dyn LedgerClient>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(Self, SubsystemLoops)> {
        let contracts = config.validate().context("invalid configuration")?;
        let chain_id = config.ethereum.chain_id;

        let validator = OrderValidator::new(
            chain_id,
            &contracts,
            config.validation.clone(),
            Arc::clone(&ledger),
            Arc::new(SystemTimeSource),
        )
        .context("failed to build order validator")?;

        let events = BroadcastRegistry::with_policy(config.rpc.subscriber_buffer, config.rpc.overflow_policy);
        let (watcher_loop, watcher) = OrderWatcher::new(
            config.watcher.clone(),
            Arc::new(validator),
            Arc::new(SystemTimeSource),
            events,
        )
        .context("failed to build order watcher")?;
        let watcher_api: Arc<dyn OrderWatcherApi> = Arc::new(watcher.clone());
        let head_poller = HeadPoller::new(Arc::clone(&ledger), Arc::clone(&watcher_api), &config.watcher);

        let snapshots = Arc::new(
            SnapshotStore::new(
                Arc::new(WatcherOrderSource::new(Arc::clone(&watcher_api))),
                config.snapshots.clone(),
            )
            .context("failed to build snapshot store")?,
        );

        let identity = NetworkIdentity::new(PeerId::random(), chain_id);
        let (host, gossip) = TcpPeerHost::bind(&config.network, identity, shutdown.clone())
            .await
            .context("failed to start peer host")?;
        let p2p_addr = host.local_addr();
        let network = Arc::new(
            PeerNetwork::new(
                chain_id,
                config.network.clone(),
                Arc::new(host),
                Arc::new(WatcherOrderSink::new(Arc::clone(&watcher_api))),
            )
            .context("failed to build peer network")?,
        );
        info!(
            myPeerID = %network.identity().peer_id,
            addresses = ?network.listen_addrs(),
            "starting p2p node"
        );

        let backend = MeshBackend::new(
            config.version.clone(),
            config.validation.max_expiration_time,
            Arc::clone(&watcher_api),
            snapshots.clone(),
            network.clone(),
        );
        let rpc = RpcServer::new(config.rpc.clone(), Arc::new(backend), shutdown)
            .context("failed to build RPC server")?;
        let rpc_listener = rpc.bind().await.context("failed to bind RPC listener")?;
        let rpc_addr = rpc_listener
            .local_addr()
            .context("failed to read RPC listener address")?;

        let container = Self {
            config,
            contracts,
            ledger,
            watcher,
            snapshots,
            network,
            p2p_addr,
            rpc_addr,
        };
        let loops = SubsystemLoops {
            watcher: watcher_loop,
            head_poller,
            gossip,
            rpc,
            rpc_listener,
        };
        Ok((container, loops))
    }
}
