//! # Adapters
//!
//! Concrete [`crate::LedgerClient`] implementations.

pub mod memory;
