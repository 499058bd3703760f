//! # Event Publisher
//!
//! Defines the publishing side of the broadcast registry.

use crate::subscriber::{OverflowPolicy, SubscriberId, Subscription};
use crate::DEFAULT_MAILBOX_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Trait for publishing values to every active subscriber.
///
/// Implementations must not block on any single subscriber.
pub trait EventPublisher<T>: Send + Sync {
    /// Publish a value to all current subscribers.
    ///
    /// # Returns
    ///
    /// The number of subscribers the value was queued for.
    fn publish(&self, event: T) -> usize;

    /// Get the total number of values published.
    fn events_published(&self) -> u64;
}

struct RegistryInner<T> {
    sender: broadcast::Sender<T>,
    closed: watch::Sender<bool>,
    next_id: AtomicU64,
    capacity: usize,
    policy: OverflowPolicy,
    events_published: AtomicU64,
}

/// Broadcast channel plus the overflow policy handed to each subscriber.
///
/// Cloning yields another handle to the same registry.
pub struct BroadcastRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for BroadcastRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> BroadcastRegistry<T> {
    /// Create a registry with default capacity and the drop-oldest policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_MAILBOX_CAPACITY, OverflowPolicy::default())
    }

    /// Create a registry with the given per-subscriber capacity and policy.
    #[must_use]
    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(RegistryInner {
                sender,
                closed,
                next_id: AtomicU64::new(1),
                capacity,
                policy,
                events_published: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber. It sees values published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscriber = id.0, capacity = self.inner.capacity, "New subscription created");
        Subscription::new(
            id,
            self.inner.sender.subscribe(),
            self.inner.closed.subscribe(),
            self.inner.policy,
        )
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    #[must_use]
    pub fn policy(&self) -> OverflowPolicy {
        self.inner.policy
    }

    /// End every subscription, current and future. Used on shutdown.
    pub fn close_all(&self) {
        self.inner.closed.send_replace(true);
        debug!(open = self.subscriber_count(), "All subscriptions closed");
    }
}

impl<T: Clone + Send + Sync + 'static> Default for BroadcastRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> EventPublisher<T> for BroadcastRegistry<T> {
    fn publish(&self, event: T) -> usize {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        // An error only means nobody is subscribed.
        self.inner.sender.send(event).unwrap_or(0)
    }

    fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }
}
