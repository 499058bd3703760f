//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::WatcherStats;
use crate::events::WatcherError;
use async_trait::async_trait;
use mesh_02_ethereum::BlockHeader;
use shared_bus::Subscription;
use shared_types::{ContractEvent, OrderEvent, OrderHash, OrderInfo, SignedOrder, ValidationResponse};

/// Operations offered by the order watcher.
///
/// Every call is a message to the watcher loop; none of them touch order
/// state directly.
#[async_trait]
pub trait OrderWatcherApi: Send + Sync {
    /// Validate and admit `orders`.
    ///
    /// The `Added` events of this admission are published to subscribers
    /// before this returns.
    async fn add_orders(&self, orders: Vec<SignedOrder>) -> Result<ValidationResponse, WatcherError>;

    /// Hashes of every visible order, ascending.
    async fn current_hashes(&self) -> Result<Vec<OrderHash>, WatcherError>;

    /// Current infos for `hashes`, in request order. Unknown or hidden
    /// hashes are skipped.
    async fn order_infos(&self, hashes: Vec<OrderHash>) -> Result<Vec<OrderInfo>, WatcherError>;

    async fn stats(&self) -> Result<WatcherStats, WatcherError>;

    /// Report a new ledger head and its decoded contract events.
    async fn new_head(&self, header: BlockHeader, events: Vec<ContractEvent>) -> Result<(), WatcherError>;

    /// Register for order event batches.
    fn subscribe(&self) -> Subscription<Vec<OrderEvent>>;
}
