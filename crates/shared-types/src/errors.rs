//! # Error Types
//!
//! Defines error types used when decoding shared primitives.

use thiserror::Error;

/// Errors that can occur while parsing hex-encoded primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// The input is not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded value has the wrong number of bytes.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors that can occur while parsing decimal 256-bit amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The input is not a base-10 unsigned integer that fits in 256 bits.
    #[error("Invalid decimal amount: {0}")]
    InvalidDecimal(String),
}
