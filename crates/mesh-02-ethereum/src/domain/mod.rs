//! # Domain Layer
//!
//! Pure ledger-facing types with no I/O.

pub mod asset_data;
pub mod contract_addresses;
pub mod entities;
pub mod errors;
