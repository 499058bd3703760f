//! # Watcher Events and Errors
//!
//! Typed log records emitted by the watcher loop and head poller, and the
//! crate error enum.

use shared_types::{EndState, OrderHash};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced by the watcher handle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatcherError {
    /// The watcher loop is no longer running.
    #[error("order watcher stopped")]
    Stopped,

    #[error("invalid watcher configuration: {0}")]
    InvalidConfig(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] mesh_02_ethereum::LedgerError),
}

/// Structured log records of the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherLogEvent {
    OrdersAdmitted {
        submitted: usize,
        added: usize,
        already_watched: usize,
    },
    OrderTransition {
        order_hash: OrderHash,
        end_state: EndState,
    },
    RevalidationScheduled {
        orders: usize,
        coalesced: usize,
    },
    HeadProcessed {
        number: u64,
        events: usize,
        affected: usize,
    },
    PollFailed {
        error: String,
    },
    Stopped {
        orders: usize,
    },
}

impl WatcherLogEvent {
    pub fn emit(&self) {
        match self {
            WatcherLogEvent::OrdersAdmitted {
                submitted,
                added,
                already_watched,
            } => debug!(submitted, added, already_watched, "orders admitted"),
            WatcherLogEvent::OrderTransition { order_hash, end_state } => {
                debug!(order_hash = %order_hash, end_state = end_state.as_label(), "order state changed")
            }
            WatcherLogEvent::RevalidationScheduled { orders, coalesced } => {
                debug!(orders, coalesced, "re-validation scheduled")
            }
            WatcherLogEvent::HeadProcessed {
                number,
                events,
                affected,
            } => debug!(number, events, affected, "processed new block"),
            WatcherLogEvent::PollFailed { error } => warn!(error = %error, "block poll failed"),
            WatcherLogEvent::Stopped { orders } => info!(orders, "order watcher stopped"),
        }
    }
}
