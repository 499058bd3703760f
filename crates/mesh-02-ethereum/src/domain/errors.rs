//! # Ethereum Errors

use shared_types::BlockHash;
use thiserror::Error;

/// Contract address table errors. All of these are fatal at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractAddressError {
    /// The production table is fixed.
    #[error("cannot add contract addresses for chainID 1: addresses for mainnet are hard-coded and cannot be changed")]
    MainnetImmutable,

    /// A required role was left as the zero address.
    #[error("cannot add contract addresses for chain ID {chain_id}: {role} address is required")]
    MissingRole { chain_id: u64, role: &'static str },

    /// No built-in or custom table exists for this chain.
    #[error("cannot create contract addresses for non-standard chainID {0}")]
    UnknownChain(u64),
}

/// Asset data could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetDataError {
    #[error("asset data too short: {0} bytes")]
    TooShort(usize),

    #[error("unsupported asset proxy id 0x{0}")]
    UnknownProxy(String),

    #[error("malformed {proxy} asset data")]
    Malformed { proxy: &'static str },
}

/// Ledger client failures.
///
/// These are transient from the mesh's point of view: the affected orders are
/// rejected with `EthRPCRequestFailed` and retried on the next trigger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Request(String),

    #[error("ledger request timed out")]
    Timeout,

    #[error("unknown block {0}")]
    UnknownBlock(BlockHash),

    #[error("ledger returned {actual} states for {expected} orders")]
    LengthMismatch { expected: usize, actual: usize },
}
