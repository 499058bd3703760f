//! # Shared Bus - Broadcast Registry for Order Events
//!
//! Fans out values from one producer (the order watcher) to any number of
//! independent subscribers (RPC subscriptions) over a
//! `tokio::sync::broadcast` channel.
//!
//! ## Delivery Model
//!
//! ```text
//!                       publish(batch)
//!   Order Watcher ─────────────┐
//!                              ▼
//!                   ┌────────────────────┐
//!                   │ BroadcastRegistry  │
//!                   │  broadcast ring    │   capacity = subscriber buffer
//!                   └──┬───────┬───────┬─┘
//!                      ▼       ▼       ▼
//!                   sub #1  sub #2  sub #3   recv().await
//! ```
//!
//! Publishing never waits on a subscriber. A subscriber that falls more than
//! the buffer behind observes a lag, handled by its [`OverflowPolicy`]:
//!
//! - **DropOldest**: skip the lost values and keep receiving.
//! - **Disconnect**: end the subscription.
//!
//! Dropping a [`Subscription`] releases its receiver immediately.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use publisher::{BroadcastRegistry, EventPublisher};
pub use subscriber::{OverflowPolicy, SubscriberId, Subscription};

/// Default number of values buffered per subscriber.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_MAILBOX_CAPACITY, 256);
    }
}
