//! # Watcher Entities

use mesh_02_ethereum::decode_asset_data;
use serde::{Deserialize, Serialize};
use shared_types::{Address, LatestBlock, OrderHash, OrderInfo, U256};

/// An order in the live set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedOrder {
    pub info: OrderInfo,
    /// Contract whose logs can change this order's funding, if one exists.
    pub maker_token: Option<Address>,
    /// Unix time the order was found unfunded. `None` while funded.
    pub unfunded_since: Option<u64>,
}

impl WatchedOrder {
    #[must_use]
    pub fn new(info: OrderInfo) -> Self {
        let maker_token = decode_asset_data(info.signed_order.maker_asset_data.as_slice())
            .ok()
            .and_then(|asset| asset.tracked_token());
        Self {
            info,
            maker_token,
            unfunded_since: None,
        }
    }

    #[must_use]
    pub fn hash(&self) -> OrderHash {
        self.info.order_hash
    }

    #[must_use]
    pub fn maker(&self) -> Address {
        self.info.signed_order.maker_address
    }

    #[must_use]
    pub fn expiration(&self) -> U256 {
        self.info.signed_order.expiration_time_seconds
    }

    /// Unfunded orders stay in the set but are hidden from queries and counts.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.unfunded_since.is_none()
    }
}

/// Point-in-time watcher summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStats {
    /// Visible orders.
    pub num_orders: usize,
    /// Visible plus unfunded orders still within their grace period.
    pub num_orders_including_hidden: usize,
    pub latest_block: LatestBlock,
}
