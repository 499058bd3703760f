//! # Core Domain Entities
//!
//! Defines the order entities exchanged between subsystems and clients.
//!
//! ## Clusters
//!
//! - **Orders**: `SignedOrder`, `OrderInfo`, `ValidationResponse`, `RejectedOrderInfo`
//! - **Events**: `OrderEvent`, `EndState`, `ContractEvent`
//! - **Chain**: `LatestBlock`
//! - **Networking**: `PeerInfo`

use crate::hashing;
use crate::primitives::{u256_dec, Address, Bytes, Hash};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-derived identifier of a [`SignedOrder`].
pub type OrderHash = Hash;

/// Hash of a ledger block.
pub type BlockHash = Hash;

// =============================================================================
// CLUSTER A: ORDERS
// =============================================================================

/// A signed, off-chain declaration of willingness to trade a maker asset for
/// a taker asset.
///
/// The order hash is not a field. Call [`SignedOrder::hash`], which is a pure
/// function of the other fields (the signature excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    pub chain_id: u64,
    pub exchange_address: Address,
    pub maker_address: Address,
    pub maker_asset_data: Bytes,
    pub maker_fee_asset_data: Bytes,
    #[serde(with = "u256_dec")]
    pub maker_asset_amount: U256,
    #[serde(with = "u256_dec")]
    pub maker_fee: U256,
    pub taker_address: Address,
    pub taker_asset_data: Bytes,
    pub taker_fee_asset_data: Bytes,
    #[serde(with = "u256_dec")]
    pub taker_asset_amount: U256,
    #[serde(with = "u256_dec")]
    pub taker_fee: U256,
    pub sender_address: Address,
    pub fee_recipient_address: Address,
    #[serde(with = "u256_dec")]
    pub expiration_time_seconds: U256,
    #[serde(with = "u256_dec")]
    pub salt: U256,
    pub signature: Bytes,
}

impl SignedOrder {
    /// Compute the order hash.
    #[must_use]
    pub fn hash(&self) -> OrderHash {
        hashing::order_hash(self)
    }

    /// Approximate encoded size in bytes, used for size limits.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

/// An admitted order together with its current fillable amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub order_hash: OrderHash,
    pub signed_order: SignedOrder,
    #[serde(with = "u256_dec")]
    pub fillable_taker_asset_amount: U256,
}

impl OrderInfo {
    /// Build an `OrderInfo`, deriving the hash from the order.
    #[must_use]
    pub fn new(signed_order: SignedOrder, fillable_taker_asset_amount: U256) -> Self {
        Self {
            order_hash: signed_order.hash(),
            signed_order,
            fillable_taker_asset_amount,
        }
    }
}

/// Which layer produced a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectedOrderKind {
    /// The order is invalid under the exchange protocol rules.
    ZeroexValidation,
    /// The order is valid on-chain but not accepted by this node's policy.
    MeshValidation,
    /// The node failed to determine validity.
    MeshError,
}

/// Machine-readable rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectedOrderCode {
    OrderHasInvalidSchema,
    OrderHasInvalidMakerAssetAmount,
    OrderHasInvalidTakerAssetAmount,
    OrderHasInvalidMakerAssetData,
    OrderHasInvalidTakerAssetData,
    OrderForIncorrectChain,
    IncorrectExchangeAddress,
    MaxOrderSizeExceeded,
    OrderHasInvalidSignature,
    OrderExpired,
    OrderMaxExpirationExceeded,
    OrderFullyFilled,
    OrderCancelled,
    OrderUnfunded,
    #[serde(rename = "EthRPCRequestFailed")]
    EthRpcRequestFailed,
    InternalError,
}

impl RejectedOrderCode {
    /// The layer responsible for this code.
    #[must_use]
    pub fn kind(&self) -> RejectedOrderKind {
        use RejectedOrderCode::*;
        match self {
            OrderHasInvalidMakerAssetAmount
            | OrderHasInvalidTakerAssetAmount
            | OrderHasInvalidMakerAssetData
            | OrderHasInvalidTakerAssetData
            | OrderHasInvalidSignature
            | OrderExpired
            | OrderFullyFilled
            | OrderCancelled
            | OrderUnfunded => RejectedOrderKind::ZeroexValidation,
            OrderHasInvalidSchema
            | OrderForIncorrectChain
            | IncorrectExchangeAddress
            | MaxOrderSizeExceeded
            | OrderMaxExpirationExceeded => RejectedOrderKind::MeshValidation,
            EthRpcRequestFailed | InternalError => RejectedOrderKind::MeshError,
        }
    }

    /// Human-readable message for this code.
    #[must_use]
    pub fn message(&self) -> &'static str {
        use RejectedOrderCode::*;
        match self {
            OrderHasInvalidSchema => "order did not pass JSON-schema validation",
            OrderHasInvalidMakerAssetAmount => "order makerAssetAmount cannot be 0",
            OrderHasInvalidTakerAssetAmount => "order takerAssetAmount cannot be 0",
            OrderHasInvalidMakerAssetData => "order makerAssetData must encode a supported assetData type",
            OrderHasInvalidTakerAssetData => "order takerAssetData must encode a supported assetData type",
            OrderForIncorrectChain => "order was created for a different chain than the one this node is configured for",
            IncorrectExchangeAddress => "the exchange address for the order does not match the chain ID/network ID",
            MaxOrderSizeExceeded => "order exceeds the maximum encoded size",
            OrderHasInvalidSignature => "order signature must be valid",
            OrderExpired => "order expired according to latest block timestamp",
            OrderMaxExpirationExceeded => "order expiration too far in the future",
            OrderFullyFilled => "order already fully filled",
            OrderCancelled => "order cancelled",
            OrderUnfunded => "maker has insufficient balance or allowance for this order to be filled",
            EthRpcRequestFailed => "network request to Ethereum RPC endpoint failed",
            InternalError => "an unexpected internal error has occurred",
        }
    }

    /// True for codes that indicate the order itself is malformed, as opposed
    /// to its on-chain state having changed.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        use RejectedOrderCode::*;
        matches!(
            self,
            OrderHasInvalidSchema
                | OrderHasInvalidMakerAssetAmount
                | OrderHasInvalidTakerAssetAmount
                | OrderHasInvalidMakerAssetData
                | OrderHasInvalidTakerAssetData
                | OrderForIncorrectChain
                | IncorrectExchangeAddress
                | MaxOrderSizeExceeded
                | OrderHasInvalidSignature
                | OrderMaxExpirationExceeded
        )
    }
}

impl fmt::Display for RejectedOrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Code and message describing why an order was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedOrderStatus {
    pub code: RejectedOrderCode,
    pub message: String,
}

impl From<RejectedOrderCode> for RejectedOrderStatus {
    fn from(code: RejectedOrderCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}

/// An order that was not admitted, with the reason.
///
/// `signed_order` is `None` and `order_hash` is zero when the submitted
/// value could not be decoded as an order at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedOrderInfo {
    pub order_hash: OrderHash,
    pub signed_order: Option<SignedOrder>,
    pub kind: RejectedOrderKind,
    pub status: RejectedOrderStatus,
}

impl RejectedOrderInfo {
    #[must_use]
    pub fn new(signed_order: SignedOrder, code: RejectedOrderCode) -> Self {
        Self {
            order_hash: signed_order.hash(),
            signed_order: Some(signed_order),
            kind: code.kind(),
            status: code.into(),
        }
    }

    /// Rejection of a value that does not decode as a [`SignedOrder`].
    #[must_use]
    pub fn invalid_schema(reason: impl fmt::Display) -> Self {
        let code = RejectedOrderCode::OrderHasInvalidSchema;
        Self {
            order_hash: OrderHash::default(),
            signed_order: None,
            kind: code.kind(),
            status: RejectedOrderStatus {
                code,
                message: format!("{}: {reason}", code.message()),
            },
        }
    }

    #[must_use]
    pub fn code(&self) -> RejectedOrderCode {
        self.status.code
    }
}

/// Exhaustive, disjoint partition of a validated batch.
///
/// Input order is not preserved in either list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub accepted: Vec<OrderInfo>,
    pub rejected: Vec<RejectedOrderInfo>,
}

impl ValidationResponse {
    /// Total number of orders in the partition.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge another partition into this one.
    pub fn extend(&mut self, other: ValidationResponse) {
        self.accepted.extend(other.accepted);
        self.rejected.extend(other.rejected);
    }
}

/// Decode each value as a [`SignedOrder`] on its own.
///
/// One malformed entry never fails the others; it comes back as an
/// `OrderHasInvalidSchema` rejection instead.
#[must_use]
pub fn decode_orders(raw: Vec<serde_json::Value>) -> (Vec<SignedOrder>, Vec<RejectedOrderInfo>) {
    let mut orders = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();
    for value in raw {
        match serde_json::from_value::<SignedOrder>(value) {
            Ok(order) => orders.push(order),
            Err(e) => rejected.push(RejectedOrderInfo::invalid_schema(e)),
        }
    }
    (orders, rejected)
}

// =============================================================================
// CLUSTER B: EVENTS
// =============================================================================

/// Classification of an order's validity and fill status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndState {
    Added,
    Filled,
    FullyFilled,
    Cancelled,
    Expired,
    Unfunded,
    Invalid,
    StoppedWatching,
}

impl EndState {
    /// Terminal states remove the order from the live set.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EndState::FullyFilled
                | EndState::Cancelled
                | EndState::Expired
                | EndState::Invalid
                | EndState::StoppedWatching
        )
    }

    /// Stable lowercase label used in metrics.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            EndState::Added => "added",
            EndState::Filled => "filled",
            EndState::FullyFilled => "fully_filled",
            EndState::Cancelled => "cancelled",
            EndState::Expired => "expired",
            EndState::Unfunded => "unfunded",
            EndState::Invalid => "invalid",
            EndState::StoppedWatching => "stopped_watching",
        }
    }
}

/// Kinds of ledger log events the watcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractEventKind {
    ERC20TransferEvent,
    ERC20ApprovalEvent,
    ERC721TransferEvent,
    ERC721ApprovalEvent,
    ExchangeFillEvent,
    ExchangeCancelEvent,
    ExchangeCancelUpToEvent,
    WethDepositEvent,
    WethWithdrawalEvent,
}

impl ContractEventKind {
    /// Events emitted by token contracts rather than the exchange.
    #[must_use]
    pub fn is_token_event(&self) -> bool {
        !matches!(
            self,
            ContractEventKind::ExchangeFillEvent
                | ContractEventKind::ExchangeCancelEvent
                | ContractEventKind::ExchangeCancelUpToEvent
        )
    }
}

/// Decoded parameters of a [`ContractEvent`]. Only the fields meaningful for
/// the event's kind are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEventParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spender: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maker: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_hash: Option<OrderHash>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_u256_dec")]
    pub value: Option<U256>,
}

mod opt_u256_dec {
    use crate::primitives::parse_u256_dec;
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse_u256_dec(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// A ledger log entry relevant to one or more orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEvent {
    pub block_hash: BlockHash,
    pub tx_hash: Hash,
    pub tx_index: u64,
    pub log_index: u64,
    pub is_removed: bool,
    /// Contract that emitted the log.
    pub address: Address,
    pub kind: ContractEventKind,
    pub parameters: ContractEventParams,
}

impl ContractEvent {
    /// Every account address named in the event's parameters.
    #[must_use]
    pub fn touched_addresses(&self) -> Vec<Address> {
        let p = &self.parameters;
        [p.from, p.to, p.owner, p.spender, p.maker]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// A state transition of one order.
///
/// Exactly one event is emitted per transition. Events produced in one
/// admission or re-validation cycle are delivered together as one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub order_hash: OrderHash,
    pub signed_order: SignedOrder,
    pub end_state: EndState,
    #[serde(with = "u256_dec")]
    pub fillable_taker_asset_amount: U256,
    pub contract_events: Vec<ContractEvent>,
}

// =============================================================================
// CLUSTER C: CHAIN & NETWORKING
// =============================================================================

/// The most recent ledger head the node has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestBlock {
    pub number: u64,
    pub hash: BlockHash,
}

/// A peer identity plus its reachable addresses.
///
/// Values crossing subsystem boundaries are copies; the peer network owns the
/// live connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    pub addrs: Vec<String>,
}
