//! # Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use primitive_types::U256;
use shared_types::{SignedOrder, ValidationResponse};

/// Order validation API.
///
/// Implementations must be thread-safe (`Send + Sync`): the watcher calls
/// them from spawned re-validation tasks.
#[async_trait]
pub trait OrderValidationApi: Send + Sync {
    /// Validate a batch.
    ///
    /// Never fails as a whole. Every input order appears in exactly one of
    /// `accepted` or `rejected`; input order is not preserved.
    async fn validate_orders(&self, orders: Vec<SignedOrder>) -> ValidationResponse;

    /// Chain this validator admits orders for.
    fn chain_id(&self) -> u64;

    /// Latest expiration time (unix seconds) an order may carry.
    fn max_expiration_time(&self) -> U256;
}
