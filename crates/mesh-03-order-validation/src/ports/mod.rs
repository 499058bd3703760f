//! # Ports Layer
//!
//! - **Inbound (Driving)**: [`inbound::OrderValidationApi`], used by the watcher
//! - **Outbound (Driven)**: the ledger client and a time source

pub mod inbound;
pub mod outbound;
