//! # Ports Layer
//!
//! - `inbound.rs` - [`OrderWatcherApi`](inbound::OrderWatcherApi), what the
//!   rest of the node calls
//! - `outbound.rs` - the validator, ledger and clock the watcher depends on

pub mod inbound;
pub mod outbound;
