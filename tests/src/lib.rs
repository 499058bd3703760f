//! # Order Mesh Test Suite
//!
//! Cross-crate flows run against real nodes: each test starts one or more
//! [`node_runtime::NodeRuntime`]s on loopback ports with an in-memory ledger
//! and talks to them over JSON-RPC and WebSocket.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # node startup, RPC and WebSocket clients
//!     ├── order_flow.rs  # submit, page, subscribe, ledger-driven updates
//!     └── peer_flow.rs   # bootstrap, gossip, AddPeer
//! ```
//!
//! ```bash
//! cargo test -p mesh-tests
//! ```

pub mod integration;
