//! Deterministic order construction and signing for tests.
//!
//! Enabled with the `test-utils` feature.

use crate::entities::SignedOrder;
use crate::hashing::{eth_sign_digest, keccak256};
use crate::primitives::{Address, Bytes};
use k256::ecdsa::SigningKey;
use primitive_types::U256;

/// Proxy id prefix of ERC20 asset data.
pub const ERC20_PROXY_ID: [u8; 4] = [0xf4, 0x72, 0x61, 0xb0];

/// Signature type byte for EIP-712 signatures.
pub const SIGNATURE_TYPE_EIP712: u8 = 0x02;

/// Signature type byte for `eth_sign` signatures.
pub const SIGNATURE_TYPE_ETH_SIGN: u8 = 0x03;

/// Encode ERC20 asset data for `token`.
#[must_use]
pub fn erc20_asset_data(token: Address) -> Bytes {
    let mut data = ERC20_PROXY_ID.to_vec();
    data.extend_from_slice(&token.to_word());
    Bytes(data)
}

/// A maker key derived from a one-byte seed.
#[must_use]
pub fn maker_key(seed: u8) -> SigningKey {
    let mut bytes = [0x11u8; 32];
    bytes[31] = seed.max(1);
    SigningKey::from_slice(&bytes).expect("seeded key is a valid scalar")
}

/// Ethereum address of a signing key.
#[must_use]
pub fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest.0[12..]);
    Address(addr)
}

/// Sign `order` in place with `key` using the given signature type.
pub fn sign_order(order: &mut SignedOrder, key: &SigningKey, signature_type: u8) {
    let hash = order.hash();
    let digest = if signature_type == SIGNATURE_TYPE_ETH_SIGN {
        eth_sign_digest(&hash)
    } else {
        hash
    };
    let (sig, recid) = key
        .sign_prehash_recoverable(&digest.0)
        .expect("signing a 32-byte digest succeeds");
    let mut bytes = Vec::with_capacity(66);
    bytes.push(27 + recid.to_byte());
    bytes.extend_from_slice(&sig.to_bytes());
    bytes.push(signature_type);
    order.signature = Bytes(bytes);
}

/// Builder for well-formed, signed test orders.
pub struct TestOrderBuilder {
    order: SignedOrder,
    key: SigningKey,
    signature_type: u8,
}

impl TestOrderBuilder {
    /// An order on `chain_id` against `exchange`, made by the key for `maker_seed`,
    /// selling `maker_token` for `taker_token`.
    #[must_use]
    pub fn new(
        chain_id: u64,
        exchange: Address,
        maker_seed: u8,
        maker_token: Address,
        taker_token: Address,
    ) -> Self {
        let key = maker_key(maker_seed);
        let order = SignedOrder {
            chain_id,
            exchange_address: exchange,
            maker_address: address_of(&key),
            maker_asset_data: erc20_asset_data(maker_token),
            maker_fee_asset_data: Bytes::default(),
            maker_asset_amount: U256::from(1_000u64),
            maker_fee: U256::zero(),
            taker_address: Address::ZERO,
            taker_asset_data: erc20_asset_data(taker_token),
            taker_fee_asset_data: Bytes::default(),
            taker_asset_amount: U256::from(2_000u64),
            taker_fee: U256::zero(),
            sender_address: Address::ZERO,
            fee_recipient_address: Address::ZERO,
            expiration_time_seconds: U256::from(4_102_444_800u64),
            salt: U256::from(1u64),
            signature: Bytes::default(),
        };
        Self {
            order,
            key,
            signature_type: SIGNATURE_TYPE_EIP712,
        }
    }

    #[must_use]
    pub fn salt(mut self, salt: u64) -> Self {
        self.order.salt = U256::from(salt);
        self
    }

    #[must_use]
    pub fn amounts(mut self, maker: u64, taker: u64) -> Self {
        self.order.maker_asset_amount = U256::from(maker);
        self.order.taker_asset_amount = U256::from(taker);
        self
    }

    #[must_use]
    pub fn expires_at(mut self, unix_seconds: u64) -> Self {
        self.order.expiration_time_seconds = U256::from(unix_seconds);
        self
    }

    #[must_use]
    pub fn eth_sign(mut self) -> Self {
        self.signature_type = SIGNATURE_TYPE_ETH_SIGN;
        self
    }

    /// Apply an arbitrary edit before signing.
    #[must_use]
    pub fn with(mut self, edit: impl FnOnce(&mut SignedOrder)) -> Self {
        edit(&mut self.order);
        self
    }

    /// Sign and return the order.
    #[must_use]
    pub fn build(mut self) -> SignedOrder {
        sign_order(&mut self.order, &self.key, self.signature_type);
        self.order
    }
}
