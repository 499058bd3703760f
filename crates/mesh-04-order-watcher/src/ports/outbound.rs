//! # Outbound Ports (Driven Ports / SPI)
//!
//! The watcher re-uses the validator's API for admission and re-validation,
//! the ledger port for head polling, and the validator's clock abstraction
//! for expiration checks.

pub use mesh_02_ethereum::LedgerClient;
pub use mesh_03_order_validation::{OrderValidationApi, TimeSource};
