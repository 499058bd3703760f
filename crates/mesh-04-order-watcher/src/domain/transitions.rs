//! # Transition Rules
//!
//! Turns a re-validation verdict into what the watcher loop must do with the
//! order. Pure: the loop supplies the current time and the cycle's contract
//! events.
//!
//! ```text
//!              accepted (unfunded before)
//!        ┌──────────────────────────────────┐
//!        ▼                                  │
//!    ┌───────┐  lower amount + fill   ┌──────────┐
//!    │ Added │ ─────► Filled          │ Unfunded │ ── grace elapsed ──► StoppedWatching
//!    └───────┘                        └──────────┘
//!        │ OrderUnfunded                    ▲
//!        └──────────────────────────────────┘
//!
//!    OrderExpired ──► Expired    OrderFullyFilled ──► FullyFilled
//!    OrderCancelled ──► Cancelled    structural / signature ──► Invalid
//! ```

use crate::domain::entities::WatchedOrder;
use shared_types::{ContractEvent, ContractEventKind, EndState, RejectedOrderCode, U256};

/// Outcome of re-validating one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted(U256),
    Rejected(RejectedOrderCode),
}

/// What the loop must do with an order after a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Emit `end_state` and drop the order from the set.
    Remove(EndState),
    /// Emit `end_state` and keep the order with new fields.
    Update {
        end_state: EndState,
        fillable: U256,
        unfunded_since: Option<u64>,
    },
    /// Store a new fillable amount without emitting anything.
    Silent { fillable: U256 },
    /// Nothing changed.
    None,
}

/// Decide the next action for `order`.
///
/// `cycle_events` are the contract events that triggered this re-validation.
pub fn next_action(order: &WatchedOrder, verdict: Verdict, cycle_events: &[ContractEvent], now: u64) -> Action {
    match verdict {
        Verdict::Rejected(code) => match code {
            RejectedOrderCode::OrderExpired => Action::Remove(EndState::Expired),
            RejectedOrderCode::OrderFullyFilled => Action::Remove(EndState::FullyFilled),
            RejectedOrderCode::OrderCancelled => Action::Remove(EndState::Cancelled),
            RejectedOrderCode::OrderUnfunded => {
                if order.unfunded_since.is_some() {
                    Action::None
                } else {
                    Action::Update {
                        end_state: EndState::Unfunded,
                        fillable: U256::zero(),
                        unfunded_since: Some(now),
                    }
                }
            }
            RejectedOrderCode::EthRpcRequestFailed | RejectedOrderCode::InternalError => Action::None,
            _ => Action::Remove(EndState::Invalid),
        },
        Verdict::Accepted(fillable) => {
            if order.unfunded_since.is_some() {
                return Action::Update {
                    end_state: EndState::Added,
                    fillable,
                    unfunded_since: None,
                };
            }
            let current = order.info.fillable_taker_asset_amount;
            if fillable == current {
                Action::None
            } else if fillable < current && names_fill_of(cycle_events, order) {
                Action::Update {
                    end_state: EndState::Filled,
                    fillable,
                    unfunded_since: None,
                }
            } else {
                Action::Silent { fillable }
            }
        }
    }
}

fn names_fill_of(events: &[ContractEvent], order: &WatchedOrder) -> bool {
    events.iter().any(|event| {
        event.kind == ContractEventKind::ExchangeFillEvent && event.parameters.order_hash == Some(order.hash())
    })
}
