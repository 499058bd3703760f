//! # Snapshot Store (MESH-05)
//!
//! Lets clients page through the order set with a stable view while the set
//! keeps changing.
//!
//! ```text
//! get_orders(page, perPage, snapshotID)
//!        │
//!        ├─ known, unexpired id ──► reuse frozen hash sequence (refresh TTL)
//!        │
//!        └─ empty / unknown / expired id ──► OrderSource::current_hashes
//!                                            sort ascending, new UUID v4
//!        │
//!        ▼
//!   slice [page*perPage, +perPage) ──► OrderSource::order_infos (live amounts)
//! ```
//!
//! Only membership and ordering are frozen. Orders that left the live set are
//! omitted from later pages.

pub mod adapters;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::gc::gc_task;
pub use domain::config::SnapshotConfig;
pub use domain::snapshot::{page_of, GetOrdersResponse, Snapshot, SnapshotId};
pub use events::{SnapshotError, SnapshotLogEvent};
pub use ports::inbound::SnapshotApi;
pub use ports::outbound::OrderSource;
pub use service::SnapshotStore;
