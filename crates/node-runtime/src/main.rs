//! # Order Mesh Node
//!
//! Entry point of a mesh node: loads configuration, starts every subsystem
//! and runs until ctrl-c.
//!
//! The development build wires the in-memory ledger.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use mesh_02_ethereum::InMemoryLedger;
use mesh_telemetry::init_telemetry;
use node_runtime::{NodeConfig, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    // Telemetry settings may come from the config file, so it is read first.
    let config = NodeConfig::load().context("failed to load configuration")?;
    init_telemetry(&config.telemetry).context("failed to initialize telemetry")?;
    info!(
        version = %config.version,
        chain_id = config.ethereum.chain_id,
        "starting order mesh node"
    );

    let ledger = Arc::new(InMemoryLedger::new());
    let runtime = NodeRuntime::start(config, ledger).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    runtime.shutdown().await;
    Ok(())
}
