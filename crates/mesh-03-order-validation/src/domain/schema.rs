//! # Schema Check
//!
//! Structural rules an order must satisfy before any cryptography or ledger
//! access is spent on it.

use mesh_02_ethereum::decode_asset_data;
use shared_types::{Address, RejectedOrderCode, SignedOrder};

/// Node-specific parameters of the schema check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaContext {
    pub chain_id: u64,
    pub exchange: Address,
    pub max_order_size_bytes: usize,
}

/// Check `order` against `ctx`.
pub fn check_schema(order: &SignedOrder, ctx: &SchemaContext) -> Result<(), RejectedOrderCode> {
    if order.encoded_len() > ctx.max_order_size_bytes {
        return Err(RejectedOrderCode::MaxOrderSizeExceeded);
    }
    if order.chain_id != ctx.chain_id {
        return Err(RejectedOrderCode::OrderForIncorrectChain);
    }
    if order.exchange_address != ctx.exchange {
        return Err(RejectedOrderCode::IncorrectExchangeAddress);
    }
    if order.maker_asset_amount.is_zero() {
        return Err(RejectedOrderCode::OrderHasInvalidMakerAssetAmount);
    }
    if order.taker_asset_amount.is_zero() {
        return Err(RejectedOrderCode::OrderHasInvalidTakerAssetAmount);
    }
    if decode_asset_data(order.maker_asset_data.as_slice()).is_err() {
        return Err(RejectedOrderCode::OrderHasInvalidMakerAssetData);
    }
    if decode_asset_data(order.taker_asset_data.as_slice()).is_err() {
        return Err(RejectedOrderCode::OrderHasInvalidTakerAssetData);
    }
    Ok(())
}
