//! # Ports Layer
//!
//! - **Outbound (Driven)**: the ledger client every ledger-reading subsystem
//!   depends on

pub mod outbound;
