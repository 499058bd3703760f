//! # Head Scoping
//!
//! Decides which watched orders a block's contract events can affect, so a
//! new head re-validates only those orders.
//!
//! An order is affected when:
//!
//! 1. an `ExchangeFillEvent` or `ExchangeCancelEvent` names its hash
//! 2. an `ExchangeCancelUpToEvent` names its maker
//! 3. a token event touches its maker and was emitted by its maker-asset
//!    token contract. Orders without a single tracked token (ERC1155,
//!    MultiAsset, StaticCall) match on the maker alone.

use crate::domain::entities::WatchedOrder;
use shared_types::{Address, ContractEvent, ContractEventKind, OrderHash};
use std::collections::{HashMap, HashSet};

/// Map each affected order hash to the events that affected it, in block
/// order.
pub fn affected_orders<'a, I>(events: &[ContractEvent], orders: I) -> HashMap<OrderHash, Vec<ContractEvent>>
where
    I: IntoIterator<Item = &'a WatchedOrder>,
{
    let mut affected: HashMap<OrderHash, Vec<ContractEvent>> = HashMap::new();
    if events.is_empty() {
        return affected;
    }

    let mut by_hash: HashSet<OrderHash> = HashSet::new();
    let mut by_maker: HashMap<Address, Vec<(OrderHash, Option<Address>)>> = HashMap::new();
    for order in orders {
        by_hash.insert(order.hash());
        by_maker
            .entry(order.maker())
            .or_default()
            .push((order.hash(), order.maker_token));
    }

    for event in events {
        match event.kind {
            ContractEventKind::ExchangeFillEvent | ContractEventKind::ExchangeCancelEvent => {
                if let Some(hash) = event.parameters.order_hash.filter(|h| by_hash.contains(h)) {
                    affected.entry(hash).or_default().push(event.clone());
                }
            }
            ContractEventKind::ExchangeCancelUpToEvent => {
                let Some(maker) = event.parameters.maker else {
                    continue;
                };
                for (hash, _) in by_maker.get(&maker).into_iter().flatten() {
                    affected.entry(*hash).or_default().push(event.clone());
                }
            }
            _ => {
                let mut touched = event.touched_addresses();
                touched.sort();
                touched.dedup();
                for account in touched {
                    for (hash, token) in by_maker.get(&account).into_iter().flatten() {
                        if token.map_or(true, |token| token == event.address) {
                            affected.entry(*hash).or_default().push(event.clone());
                        }
                    }
                }
            }
        }
    }
    affected
}
