//! # Outbound Ports (Driven Ports / SPI)

use crate::events::SnapshotError;
use async_trait::async_trait;
use shared_types::{OrderHash, OrderInfo};

/// Read access to the live order set.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Every visible order hash, captured atomically.
    async fn current_hashes(&self) -> Result<Vec<OrderHash>, SnapshotError>;

    /// Live infos for `hashes`, in request order. Orders that left the set
    /// are skipped.
    async fn order_infos(&self, hashes: Vec<OrderHash>) -> Result<Vec<OrderInfo>, SnapshotError>;
}
