//! Ports of the RPC gateway.

pub mod outbound;
