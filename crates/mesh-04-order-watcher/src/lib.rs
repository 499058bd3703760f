//! # Order Watcher (MESH-04)
//!
//! Owns the live order set: admits validated orders, keeps fillable amounts
//! current as the ledger moves, and emits one [`OrderEvent`] per state
//! transition.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): watched orders, expiration index, head
//!   scoping and transition rules
//! - **Ports Layer** (`ports/`): [`OrderWatcherApi`] in, validator, ledger and
//!   clock out
//! - **Service** (`service.rs`): the single coordinating loop and its handle
//! - **Adapters** (`adapters/`): [`HeadPoller`]
//!
//! ## Re-validation Triggers
//!
//! | Trigger | Orders re-validated |
//! |---------|---------------------|
//! | New head | orders matched by the head's contract events |
//! | Expiration tick | none; expired orders are removed directly |
//! | Sweep | every watched order |
//!
//! At most one re-validation per order hash is in flight. A trigger for an
//! in-flight hash is folded into a single rerun.
//!
//! [`OrderEvent`]: shared_types::OrderEvent

pub mod adapters;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::head_poller::HeadPoller;
pub use domain::config::WatcherConfig;
pub use domain::entities::{WatchedOrder, WatcherStats};
pub use domain::expiration::ExpirationIndex;
pub use domain::scoping::affected_orders;
pub use domain::transitions::{next_action, Action, Verdict};
pub use events::{WatcherError, WatcherLogEvent};
pub use ports::inbound::OrderWatcherApi;
pub use service::{OrderWatcher, WatcherHandle};
