//! # Outbound Ports (Driven Ports / SPI)
//!
//! The ledger client is an external collaborator: the mesh depends on it but
//! does not implement a production one.

use crate::domain::entities::{BlockHeader, OrderRelevantState};
use crate::domain::errors::LedgerError;
use async_trait::async_trait;
use shared_types::{ContractEvent, SignedOrder};

/// Read access to chain state and the validation helper contract.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The current chain head.
    async fn latest_block(&self) -> Result<BlockHeader, LedgerError>;

    /// The canonical block at `number`.
    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, LedgerError>;

    /// Batched fillability query. Returns one state per input order, in
    /// input order.
    ///
    /// # Errors
    /// * `LedgerError::Request` - The call failed; no state is known for any
    ///   order in the batch.
    async fn order_relevant_states(
        &self,
        orders: &[SignedOrder],
    ) -> Result<Vec<OrderRelevantState>, LedgerError>;

    /// Decoded contract logs of one block.
    async fn block_events(&self, block: &BlockHeader) -> Result<Vec<ContractEvent>, LedgerError>;
}
