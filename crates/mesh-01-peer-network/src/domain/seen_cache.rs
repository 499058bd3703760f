//! Bounded memory of order hashes already handled by gossip.

use shared_types::OrderHash;
use std::collections::{HashSet, VecDeque};

/// FIFO-evicting set of order hashes.
#[derive(Debug)]
pub struct SeenOrderCache {
    capacity: usize,
    order: VecDeque<OrderHash>,
    members: HashSet<OrderHash>,
}

impl SeenOrderCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    /// Record a hash. Returns `true` if it was not already present.
    pub fn insert(&mut self, hash: OrderHash) -> bool {
        if !self.members.insert(hash) {
            return false;
        }
        self.order.push_back(hash);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        true
    }
}
