//! # Subsystem Container
//!
//! Configuration plus the container that builds and holds every subsystem.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, EthereumConfig, NodeConfig};
pub use subsystems::{SubsystemContainer, SubsystemLoops};
