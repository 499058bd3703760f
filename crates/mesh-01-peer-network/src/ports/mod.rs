//! # Ports Layer
//!
//! - [`inbound`]: the API the rest of the node drives the network through
//! - [`outbound`]: the transport host and the order sink

pub mod inbound;
pub mod outbound;
