//! # Inbound Ports (Driving Ports / API)

use crate::domain::snapshot::GetOrdersResponse;
use crate::events::SnapshotError;
use async_trait::async_trait;

/// Paginated, snapshot-consistent order queries.
#[async_trait]
pub trait SnapshotApi: Send + Sync {
    /// One zero-based page of a snapshot.
    ///
    /// An empty, unknown or expired `snapshot_id` takes a new snapshot of the
    /// current order set. This is not an error; clients cannot tell an
    /// expired id from one that never existed.
    ///
    /// # Errors
    /// * `SnapshotError::InvalidPerPage` - `per_page` is 0 or above the limit
    /// * `SnapshotError::Source` - the order set could not be read
    async fn get_orders(
        &self,
        page: usize,
        per_page: usize,
        snapshot_id: &str,
    ) -> Result<GetOrdersResponse, SnapshotError>;
}
