//! # Order Hashing
//!
//! EIP-712 typed-data hashing of orders.
//!
//! ```text
//! orderHash = keccak256(0x1901 || domainSeparator || structHash)
//! domainSeparator = keccak256(DOMAIN_TYPEHASH || keccak("0x Protocol") || keccak("3.0.0")
//!                             || chainId || exchangeAddress)
//! structHash = keccak256(ORDER_TYPEHASH || abi-encoded order fields)
//! ```
//!
//! `bytes` fields are hashed before encoding; every other field occupies one
//! 32-byte word. The signature is not part of the hash.

use crate::entities::{OrderHash, SignedOrder};
use crate::primitives::Hash;
use primitive_types::U256;
use sha3::{Digest, Keccak256};

const DOMAIN_SCHEMA: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const DOMAIN_NAME: &[u8] = b"0x Protocol";
const DOMAIN_VERSION: &[u8] = b"3.0.0";
const ORDER_SCHEMA: &[u8] = b"Order(address makerAddress,address takerAddress,address feeRecipientAddress,address senderAddress,uint256 makerAssetAmount,uint256 takerAssetAmount,uint256 makerFee,uint256 takerFee,uint256 expirationTimeSeconds,uint256 salt,bytes makerAssetData,bytes takerAssetData,bytes makerFeeAssetData,bytes takerFeeAssetData)";

/// Keccak-256 digest.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash(hasher.finalize().into())
}

fn u256_word(value: &U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// EIP-712 domain separator for an exchange deployment.
#[must_use]
pub fn domain_separator(chain_id: u64, exchange: &crate::Address) -> Hash {
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(&keccak256(DOMAIN_SCHEMA).0);
    buf.extend_from_slice(&keccak256(DOMAIN_NAME).0);
    buf.extend_from_slice(&keccak256(DOMAIN_VERSION).0);
    buf.extend_from_slice(&u256_word(&U256::from(chain_id)));
    buf.extend_from_slice(&exchange.to_word());
    keccak256(&buf)
}

fn struct_hash(order: &SignedOrder) -> Hash {
    let mut buf = Vec::with_capacity(32 * 15);
    buf.extend_from_slice(&keccak256(ORDER_SCHEMA).0);
    for addr in [
        &order.maker_address,
        &order.taker_address,
        &order.fee_recipient_address,
        &order.sender_address,
    ] {
        buf.extend_from_slice(&addr.to_word());
    }
    for amount in [
        &order.maker_asset_amount,
        &order.taker_asset_amount,
        &order.maker_fee,
        &order.taker_fee,
        &order.expiration_time_seconds,
        &order.salt,
    ] {
        buf.extend_from_slice(&u256_word(amount));
    }
    for data in [
        &order.maker_asset_data,
        &order.taker_asset_data,
        &order.maker_fee_asset_data,
        &order.taker_fee_asset_data,
    ] {
        buf.extend_from_slice(&keccak256(data.as_slice()).0);
    }
    keccak256(&buf)
}

/// Compute the hash identifying `order`.
#[must_use]
pub fn order_hash(order: &SignedOrder) -> OrderHash {
    let mut buf = Vec::with_capacity(2 + 64);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(&domain_separator(order.chain_id, &order.exchange_address).0);
    buf.extend_from_slice(&struct_hash(order).0);
    keccak256(&buf)
}

/// Digest signed by `EthSign` signatures: the personal-message prefix applied
/// to the order hash.
#[must_use]
pub fn eth_sign_digest(hash: &OrderHash) -> Hash {
    let mut buf = Vec::with_capacity(28 + 32);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n32");
    buf.extend_from_slice(&hash.0);
    keccak256(&buf)
}
