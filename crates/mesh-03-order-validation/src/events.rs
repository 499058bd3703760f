//! # Validation Events and Errors
//!
//! Typed log records emitted by the validator, and the crate error enum.

use shared_types::{OrderHash, RejectedOrderCode};
use thiserror::Error;
use tracing::{debug, warn};

/// Validator construction errors. Per-order rejections are data, not errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid validator configuration: {0}")]
    InvalidConfig(String),

    #[error("contract addresses: {0}")]
    ContractAddresses(#[from] mesh_02_ethereum::ContractAddressError),
}

/// Structured log records of the validation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationLogEvent {
    BatchValidated {
        total: usize,
        accepted: usize,
        rejected: usize,
    },
    OrderRejected {
        order_hash: OrderHash,
        code: RejectedOrderCode,
    },
    LedgerChunkFailed {
        orders: usize,
        error: String,
    },
}

impl ValidationLogEvent {
    pub fn emit(&self) {
        match self {
            ValidationLogEvent::BatchValidated {
                total,
                accepted,
                rejected,
            } => debug!(total, accepted, rejected, "validated order batch"),
            ValidationLogEvent::OrderRejected { order_hash, code } => {
                debug!(order_hash = %order_hash, code = %code, "order rejected")
            }
            ValidationLogEvent::LedgerChunkFailed { orders, error } => {
                warn!(orders, error = %error, "ledger query failed for order chunk")
            }
        }
    }
}
