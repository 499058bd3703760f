//! # Order Validation (MESH-03)
//!
//! Decides, for a batch of signed orders, which are currently admissible and
//! what each one's fillable amount is.
//!
//! ## Pipeline
//!
//! Applied per order, stopping at the first failure:
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────────────┐
//! │ schema │──►│ signature │──►│ expiration │──►│ ledger fillability   │
//! └────────┘   └───────────┘   └────────────┘   │ (chunked, bounded)   │
//!                                               └──────────────────────┘
//! ```
//!
//! The first three steps are pure and run in parallel with rayon. The ledger
//! step batches surviving orders into chunks, one `order_relevant_states` call
//! per chunk, each bounded by its own timeout. A failed chunk rejects only its
//! own orders. Batching never changes the verdict an order would get alone.
//!
//! The result is always an exhaustive, disjoint partition of the input into
//! accepted and rejected orders.

pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use domain::config::ValidatorConfig;
pub use domain::schema::{check_schema, SchemaContext};
pub use domain::signature::{recover_signer, verify_order_signature, SignatureError};
pub use events::{ValidationError, ValidationLogEvent};
pub use ports::inbound::OrderValidationApi;
pub use ports::outbound::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use service::OrderValidator;
