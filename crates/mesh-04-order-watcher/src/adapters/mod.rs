//! # Adapters
//!
//! - [`head_poller`] - drives the watcher from the ledger's chain head

pub mod head_poller;
