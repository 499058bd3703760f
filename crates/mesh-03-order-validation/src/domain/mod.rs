//! # Domain Layer
//!
//! Pure validation rules with no I/O.

pub mod config;
pub mod schema;
pub mod signature;
