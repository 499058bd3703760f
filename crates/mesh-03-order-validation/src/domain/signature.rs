//! # Order Signatures
//!
//! Signature bytes are `v || r || s || signatureType`.
//!
//! | Type | Digest recovered over |
//! |------|-----------------------|
//! | `0x02` EIP712 | the order hash |
//! | `0x03` EthSign | `keccak256("\x19Ethereum Signed Message:\n32" ‖ orderHash)` |
//!
//! Every other type is unsupported. The recovered address must equal the
//! order's maker.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use shared_types::hashing::eth_sign_digest;
use shared_types::{keccak256, Address, Hash, SignedOrder};
use thiserror::Error;

pub const SIGNATURE_TYPE_EIP712: u8 = 0x02;
pub const SIGNATURE_TYPE_ETH_SIGN: u8 = 0x03;

const SIGNATURE_LEN: usize = 66;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature must be 66 bytes, got {0}")]
    InvalidLength(usize),

    #[error("unsupported signature type 0x{0:02x}")]
    UnsupportedType(u8),

    /// v must be 0, 1, 27, or 28
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    #[error("Invalid signature format")]
    InvalidFormat,

    #[error("Failed to recover public key")]
    RecoveryFailed,

    #[error("Signer mismatch: expected {expected}, got {actual}")]
    SignerMismatch { expected: Address, actual: Address },
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };

    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(v))
}

/// Recover the address that produced `signature` over the order hash `hash`.
pub fn recover_signer(hash: &Hash, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(signature.len()));
    }
    let digest = match signature[65] {
        SIGNATURE_TYPE_EIP712 => *hash,
        SIGNATURE_TYPE_ETH_SIGN => eth_sign_digest(hash),
        other => return Err(SignatureError::UnsupportedType(other)),
    };

    let recovery_id = parse_recovery_id(signature[0])?;
    let sig = Signature::from_slice(&signature[1..65]).map_err(|_| SignatureError::InvalidFormat)?;

    let recovered_key = VerifyingKey::recover_from_prehash(&digest.0, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    // Keccak256 of the uncompressed key without its 0x04 prefix
    let pubkey = recovered_key.to_encoded_point(false);
    let key_hash = keccak256(&pubkey.as_bytes()[1..]);

    Address::from_slice(&key_hash.0[12..]).map_err(|_| SignatureError::RecoveryFailed)
}

/// Check that `order` is signed by its maker.
pub fn verify_order_signature(order: &SignedOrder) -> Result<(), SignatureError> {
    let actual = recover_signer(&order.hash(), order.signature.as_slice())?;
    if actual != order.maker_address {
        return Err(SignatureError::SignerMismatch {
            expected: order.maker_address,
            actual,
        });
    }
    Ok(())
}
