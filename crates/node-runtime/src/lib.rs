//! # Node Runtime Library
//!
//! Configuration loading, subsystem wiring and lifecycle of an order mesh
//! node. The `node-runtime` binary is a thin wrapper around
//! [`NodeRuntime`]; integration tests start nodes through the same path.
//!
//! - `container/` - configuration and the subsystem container
//! - `adapters/` - port implementations connecting subsystems
//! - `runtime` - task scheduling and graceful shutdown

pub mod adapters;
pub mod container;
pub mod runtime;

pub use container::{ConfigError, EthereumConfig, NodeConfig, SubsystemContainer};
pub use runtime::NodeRuntime;
