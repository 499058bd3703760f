//! # Adapters
//!
//! - [`gc`] - periodic collection of expired snapshots

pub mod gc;
