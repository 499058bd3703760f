//! # In-Memory Ledger
//!
//! A scriptable [`LedgerClient`] for development nodes and tests.
//!
//! State changes made through the event-producing methods (`transfer`,
//! `approve`, `fill_order`, `cancel_order`, `cancel_orders_up_to`) are
//! recorded as pending logs and sealed into a block by [`InMemoryLedger::mine_block`].
//! The `set_*` methods change state silently, for test setup.

use crate::domain::asset_data::decode_asset_data;
use crate::domain::entities::{BlockHeader, OrderRelevantState, OrderStatus};
use crate::domain::errors::LedgerError;
use crate::ports::outbound::LedgerClient;
use async_trait::async_trait;
use parking_lot::RwLock;
use primitive_types::{U256, U512};
use shared_types::{
    keccak256, Address, BlockHash, ContractEvent, ContractEventKind, ContractEventParams, Hash,
    OrderHash, SignedOrder,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Seconds between consecutive mined blocks.
const BLOCK_TIME_SECS: u64 = 12;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address), U256>,
    filled: HashMap<OrderHash, U256>,
    cancelled: HashSet<OrderHash>,
    /// Maker -> every order with a lower salt is cancelled.
    cancelled_up_to: HashMap<Address, U256>,
    blocks: Vec<(BlockHeader, Vec<ContractEvent>)>,
    pending: Vec<(Address, ContractEventKind, ContractEventParams)>,
}

/// In-memory ledger.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    latency: RwLock<Duration>,
    failing: AtomicBool,
    state_queries: AtomicU64,
}

impl InMemoryLedger {
    /// A ledger with a genesis block stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::with_genesis_timestamp(now)
    }

    #[must_use]
    pub fn with_genesis_timestamp(timestamp: u64) -> Self {
        let genesis = BlockHeader {
            number: 0,
            hash: block_hash(0, &Hash::ZERO),
            parent_hash: Hash::ZERO,
            timestamp,
        };
        let state = LedgerState {
            blocks: vec![(genesis, Vec::new())],
            ..LedgerState::default()
        };
        Self {
            state: RwLock::new(state),
            latency: RwLock::new(Duration::ZERO),
            failing: AtomicBool::new(false),
            state_queries: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // SILENT SETUP
    // =========================================================================

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state.write().balances.insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, amount: U256) {
        self.state.write().allowances.insert((token, owner), amount);
    }

    /// Give `owner` an effectively unlimited balance and allowance of `token`.
    pub fn fund(&self, token: Address, owner: Address) {
        let mut state = self.state.write();
        state.balances.insert((token, owner), U256::MAX);
        state.allowances.insert((token, owner), U256::MAX);
    }

    /// Add artificial delay to every order state query.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Make every request fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `order_relevant_states` calls served.
    #[must_use]
    pub fn state_queries(&self) -> u64 {
        self.state_queries.load(Ordering::SeqCst)
    }

    // =========================================================================
    // EVENT-PRODUCING MUTATIONS
    // =========================================================================

    /// Move `amount` of `token` between accounts and log an ERC20 transfer.
    pub fn transfer(&self, token: Address, from: Address, to: Address, amount: U256) {
        let mut state = self.state.write();
        let from_balance = state.balances.entry((token, from)).or_default();
        *from_balance = from_balance.saturating_sub(amount);
        let to_balance = state.balances.entry((token, to)).or_default();
        *to_balance = to_balance.saturating_add(amount);
        state.pending.push((
            token,
            ContractEventKind::ERC20TransferEvent,
            ContractEventParams {
                from: Some(from),
                to: Some(to),
                value: Some(amount),
                ..ContractEventParams::default()
            },
        ));
    }

    /// Set the allowance of `owner` on `token` and log an ERC20 approval.
    pub fn approve(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        let mut state = self.state.write();
        state.allowances.insert((token, owner), amount);
        state.pending.push((
            token,
            ContractEventKind::ERC20ApprovalEvent,
            ContractEventParams {
                owner: Some(owner),
                spender: Some(spender),
                value: Some(amount),
                ..ContractEventParams::default()
            },
        ));
    }

    /// Record a fill of `taker_amount` against `order` and log it.
    pub fn fill_order(&self, order: &SignedOrder, taker_amount: U256) {
        let hash = order.hash();
        let mut state = self.state.write();
        let filled = state.filled.entry(hash).or_default();
        *filled = filled.saturating_add(taker_amount);
        state.pending.push((
            order.exchange_address,
            ContractEventKind::ExchangeFillEvent,
            ContractEventParams {
                maker: Some(order.maker_address),
                order_hash: Some(hash),
                value: Some(taker_amount),
                ..ContractEventParams::default()
            },
        ));
    }

    pub fn cancel_order(&self, order: &SignedOrder) {
        let hash = order.hash();
        let mut state = self.state.write();
        state.cancelled.insert(hash);
        state.pending.push((
            order.exchange_address,
            ContractEventKind::ExchangeCancelEvent,
            ContractEventParams {
                maker: Some(order.maker_address),
                order_hash: Some(hash),
                ..ContractEventParams::default()
            },
        ));
    }

    /// Cancel every order of `maker` with a salt below `epoch`.
    pub fn cancel_orders_up_to(&self, exchange: Address, maker: Address, epoch: U256) {
        let mut state = self.state.write();
        state.cancelled_up_to.insert(maker, epoch);
        state.pending.push((
            exchange,
            ContractEventKind::ExchangeCancelUpToEvent,
            ContractEventParams {
                maker: Some(maker),
                value: Some(epoch),
                ..ContractEventParams::default()
            },
        ));
    }

    /// Seal pending logs into a new head block.
    pub fn mine_block(&self) -> BlockHeader {
        let mut state = self.state.write();
        let parent = state
            .blocks
            .last()
            .map(|(header, _)| *header)
            .unwrap_or_default();
        let number = parent.number + 1;
        let header = BlockHeader {
            number,
            hash: block_hash(number, &parent.hash),
            parent_hash: parent.hash,
            timestamp: parent.timestamp + BLOCK_TIME_SECS,
        };
        let pending = std::mem::take(&mut state.pending);
        let events: Vec<ContractEvent> = pending
            .into_iter()
            .enumerate()
            .map(|(i, (address, kind, parameters))| ContractEvent {
                block_hash: header.hash,
                tx_hash: tx_hash(&header.hash, i as u64),
                tx_index: i as u64,
                log_index: i as u64,
                is_removed: false,
                address,
                kind,
                parameters,
            })
            .collect();
        debug!(number, events = events.len(), "Mined block");
        state.blocks.push((header, events));
        header
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Request("ledger unavailable".to_string()));
        }
        Ok(())
    }

    fn relevant_state(state: &LedgerState, head: &BlockHeader, order: &SignedOrder) -> OrderRelevantState {
        let hash = order.hash();
        let filled = state.filled.get(&hash).copied().unwrap_or_default();
        let with_status = |status| OrderRelevantState {
            status,
            filled_taker_asset_amount: filled,
            fillable_taker_asset_amount: U256::zero(),
        };

        if order.maker_asset_amount.is_zero() {
            return with_status(OrderStatus::InvalidMakerAssetAmount);
        }
        if order.taker_asset_amount.is_zero() {
            return with_status(OrderStatus::InvalidTakerAssetAmount);
        }
        let cancelled_by_epoch = state
            .cancelled_up_to
            .get(&order.maker_address)
            .is_some_and(|epoch| order.salt < *epoch);
        if state.cancelled.contains(&hash) || cancelled_by_epoch {
            return with_status(OrderStatus::Cancelled);
        }
        if filled >= order.taker_asset_amount {
            return with_status(OrderStatus::FullyFilled);
        }
        if U256::from(head.timestamp) >= order.expiration_time_seconds {
            return with_status(OrderStatus::Expired);
        }

        let remaining = order.taker_asset_amount - filled;
        let funded_by_maker = match decode_asset_data(order.maker_asset_data.as_slice())
            .ok()
            .and_then(|asset| asset.tracked_token())
        {
            Some(token) => {
                let key = (token, order.maker_address);
                let balance = state.balances.get(&key).copied().unwrap_or_default();
                let allowance = state.allowances.get(&key).copied().unwrap_or_default();
                let funded = balance.min(allowance);
                // taker amount the maker's funded balance covers
                let scaled = order.taker_asset_amount.full_mul(funded) / U512::from(order.maker_asset_amount);
                U256::try_from(scaled).unwrap_or(U256::MAX)
            }
            None => remaining,
        };

        OrderRelevantState {
            status: OrderStatus::Fillable,
            filled_taker_asset_amount: filled,
            fillable_taker_asset_amount: remaining.min(funded_by_maker),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn block_hash(number: u64, parent: &BlockHash) -> BlockHash {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(&number.to_be_bytes());
    buf.extend_from_slice(&parent.0);
    keccak256(&buf)
}

fn tx_hash(block: &BlockHash, index: u64) -> Hash {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(&block.0);
    buf.extend_from_slice(&index.to_be_bytes());
    keccak256(&buf)
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn latest_block(&self) -> Result<BlockHeader, LedgerError> {
        self.check_available()?;
        let state = self.state.read();
        state
            .blocks
            .last()
            .map(|(header, _)| *header)
            .ok_or_else(|| LedgerError::Request("empty chain".to_string()))
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockHeader, LedgerError> {
        self.check_available()?;
        let state = self.state.read();
        state
            .blocks
            .get(number as usize)
            .map(|(header, _)| *header)
            .ok_or_else(|| LedgerError::Request(format!("no block {number}")))
    }

    async fn order_relevant_states(
        &self,
        orders: &[SignedOrder],
    ) -> Result<Vec<OrderRelevantState>, LedgerError> {
        self.state_queries.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.check_available()?;

        let state = self.state.read();
        let head = state
            .blocks
            .last()
            .map(|(header, _)| *header)
            .unwrap_or_default();
        Ok(orders
            .iter()
            .map(|order| Self::relevant_state(&state, &head, order))
            .collect())
    }

    async fn block_events(&self, block: &BlockHeader) -> Result<Vec<ContractEvent>, LedgerError> {
        self.check_available()?;
        let state = self.state.read();
        state
            .blocks
            .iter()
            .find(|(header, _)| header.hash == block.hash)
            .map(|(_, events)| events.clone())
            .ok_or(LedgerError::UnknownBlock(block.hash))
    }
}
