//! # Snapshot Events and Errors

use crate::domain::snapshot::SnapshotId;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("perPage must be between 1 and {max}, got {per_page}")]
    InvalidPerPage { per_page: usize, max: usize },

    /// The order set could not be read.
    #[error("order source unavailable: {0}")]
    Source(String),

    #[error("invalid snapshot configuration: {0}")]
    InvalidConfig(String),
}

/// Structured log records of the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotLogEvent {
    Created { id: SnapshotId, orders: usize },
    /// A non-empty id was unknown or expired and a new snapshot was taken.
    Replaced { requested: String },
    Collected { removed: usize, active: usize },
}

impl SnapshotLogEvent {
    pub fn emit(&self) {
        match self {
            SnapshotLogEvent::Created { id, orders } => {
                debug!(snapshot_id = %id, orders, "created order snapshot")
            }
            SnapshotLogEvent::Replaced { requested } => {
                debug!(requested = %requested, "unknown or expired snapshot id, taking a new snapshot")
            }
            SnapshotLogEvent::Collected { removed, active } => {
                debug!(removed, active, "collected expired snapshots")
            }
        }
    }
}
