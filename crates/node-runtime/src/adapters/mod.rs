//! # Port Adapters
//!
//! Concrete implementations of the outbound ports each subsystem declares,
//! backed by the other subsystems.
//!
//! | Port | Declared by | Adapter |
//! |------|-------------|---------|
//! | `OrderSink` | peer network | [`WatcherOrderSink`] |
//! | `OrderSource` | snapshot store | [`WatcherOrderSource`] |
//! | `MeshRpcBackend` | RPC gateway | [`MeshBackend`] |

pub mod rpc_backend;
pub mod watcher;

pub use rpc_backend::MeshBackend;
pub use watcher::{WatcherOrderSink, WatcherOrderSource};
