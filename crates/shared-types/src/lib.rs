//! # Shared Types Crate
//!
//! This crate contains the order domain entities exchanged between the mesh
//! subsystems and over the wire.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem order types are defined here.
//! - **Derived Identity**: An [`OrderHash`] is always computed from the
//!   [`SignedOrder`] it identifies. It is never stored on the order record,
//!   so receivers recompute it and two equal orders always hash equally.
//! - **Wire Stability**: JSON field names and number encodings (decimal strings
//!   for 256-bit amounts, `0x` hex for bytes) are part of the public interface.

pub mod entities;
pub mod errors;
pub mod hashing;
pub mod humantime_serde;
pub mod primitives;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use entities::*;
pub use errors::*;
pub use hashing::{keccak256, order_hash};
pub use primitives::{parse_u256_dec, u256_dec, Address, Bytes, Hash};

pub use primitive_types::U256;
