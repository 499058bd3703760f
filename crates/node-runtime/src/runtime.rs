//! # Node Runtime
//!
//! Schedules the subsystem loops and owns the shutdown signal.
//!
//! ## Startup Sequence
//!
//! 1. Build the container (config validation, ledger, validator, watcher,
//!    snapshot store, peer host, RPC listener)
//! 2. Spawn the watcher loop and head poller
//! 3. Spawn snapshot GC
//! 4. Bootstrap in the background
//! 5. Spawn gossip receive and discovery
//! 6. Serve RPC
//!
//! ## Shutdown
//!
//! One `watch` broadcast reaches every loop. Each task is then joined with a
//! bound; a task that does not stop in time is aborted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use mesh_01_peer_network::PeerNetworkApi;
use mesh_02_ethereum::LedgerClient;
use mesh_05_snapshot_store::gc_task;

use crate::container::{NodeConfig, SubsystemContainer, SubsystemLoops};

/// How long shutdown waits for each task.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// The running node.
pub struct NodeRuntime {
    container: SubsystemContainer,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl NodeRuntime {
    /// Build every subsystem and start its loops.
    pub async fn start(config: NodeConfig, ledger: Arc<dyn LedgerClient>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (container, loops) = SubsystemContainer::build(config, ledger, shutdown_rx.clone()).await?;
        let SubsystemLoops {
            watcher,
            head_poller,
            gossip,
            rpc,
            rpc_listener,
        } = loops;

        let mut tasks = Vec::new();
        tasks.push(("order-watcher", tokio::spawn(watcher.run(shutdown_rx.clone()))));
        tasks.push(("head-poller", tokio::spawn(head_poller.run(shutdown_rx.clone()))));
        tasks.push((
            "snapshot-gc",
            tokio::spawn(gc_task(container.snapshots.clone(), shutdown_rx.clone())),
        ));

        if container.config.network.use_bootstrap_list {
            let network = container.network.clone();
            let mut shutdown = shutdown_rx.clone();
            tasks.push((
                "bootstrap",
                tokio::spawn(async move {
                    tokio::select! {
                        result = network.bootstrap() => match result {
                            Ok(peers) => info!(peers, "bootstrap finished"),
                            Err(e) => error!(error = %e, "bootstrap failed"),
                        },
                        _ = shutdown.changed() => {}
                    }
                }),
            ));
        }

        tasks.push((
            "gossip",
            tokio::spawn(container.network.clone().run_gossip(gossip, shutdown_rx.clone())),
        ));
        tasks.push((
            "discovery",
            tokio::spawn(container.network.clone().run_discovery(shutdown_rx.clone())),
        ));

        tasks.push((
            "rpc-server",
            tokio::spawn(async move {
                if let Err(e) = rpc.serve(rpc_listener).await {
                    error!(error = %e, "RPC server failed");
                }
            }),
        ));

        Ok(Self {
            container,
            shutdown_tx,
            tasks,
        })
    }

    #[must_use]
    pub fn container(&self) -> &SubsystemContainer {
        &self.container
    }

    /// Stop every loop and wait for it to finish.
    pub async fn shutdown(self) {
        info!("initiating graceful shutdown");
        self.shutdown_tx.send_replace(true);

        for (name, handle) in self.tasks {
            let abort = handle.abort_handle();
            match tokio::time::timeout(TASK_STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(task = name, error = %e, "task ended abnormally"),
                Err(_) => {
                    warn!(task = name, "task did not stop in time; aborting");
                    abort.abort();
                }
            }
        }
        info!("shutdown complete");
    }
}
