//! # Expiration Index
//!
//! Orders keyed by expiration time so each tick only touches the orders that
//! actually expired.

use shared_types::{Hash, OrderHash, U256};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct ExpirationIndex {
    entries: BTreeSet<(U256, OrderHash)>,
}

impl ExpirationIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: OrderHash, expiration: U256) {
        self.entries.insert((expiration, hash));
    }

    pub fn remove(&mut self, hash: OrderHash, expiration: U256) {
        self.entries.remove(&(expiration, hash));
    }

    /// Remove and return every order with expiration `<= now`.
    pub fn drain_expired(&mut self, now: u64) -> Vec<OrderHash> {
        let boundary = (U256::from(now) + U256::one(), Hash::ZERO);
        let later = self.entries.split_off(&boundary);
        let expired = std::mem::replace(&mut self.entries, later);
        expired.into_iter().map(|(_, hash)| hash).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
