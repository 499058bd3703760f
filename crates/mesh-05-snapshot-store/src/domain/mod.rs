//! # Domain Layer

pub mod config;
pub mod snapshot;
