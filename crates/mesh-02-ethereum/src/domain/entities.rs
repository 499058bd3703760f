//! # Ledger Entities

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{BlockHash, LatestBlock};

/// Header fields of a ledger block the mesh cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub number: u64,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    /// Unix seconds.
    pub timestamp: u64,
}

impl From<&BlockHeader> for LatestBlock {
    fn from(header: &BlockHeader) -> Self {
        LatestBlock {
            number: header.number,
            hash: header.hash,
        }
    }
}

/// On-chain status of an order as reported by the validation helper
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Fillable,
    FullyFilled,
    Cancelled,
    Expired,
    InvalidMakerAssetAmount,
    InvalidTakerAssetAmount,
}

/// Everything the ledger knows about one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRelevantState {
    pub status: OrderStatus,
    /// Amount of taker asset already filled.
    pub filled_taker_asset_amount: U256,
    /// Remaining taker amount executable given the maker's current balance
    /// and allowance. Zero with status `Fillable` means unfunded.
    pub fillable_taker_asset_amount: U256,
}
