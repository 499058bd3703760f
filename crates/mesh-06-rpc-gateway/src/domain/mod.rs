//! Domain types for the RPC gateway.
//!
//! - `config`: listener, fan-out and middleware settings
//! - `error`: JSON-RPC error codes and [`ApiError`](error::ApiError)
//! - `types`: request/response envelopes and method payloads

pub mod config;
pub mod error;
pub mod types;
