//! # Domain Layer
//!
//! Pure watcher rules: what a watched order is, how re-validation verdicts
//! become transitions, which orders a head affects, and when orders expire.

pub mod config;
pub mod entities;
pub mod expiration;
pub mod scoping;
pub mod transitions;
