//! # Subscriber
//!
//! Defines the subscription side of the broadcast registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// What a subscriber does after falling behind by more than the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Skip the values it missed and continue with the oldest one retained.
    #[default]
    DropOldest,
    /// End the subscription.
    Disconnect,
}

/// Registry-assigned identifier of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscription handle for receiving published values.
///
/// The receiver is released when the subscription ends or is dropped.
pub struct Subscription<T> {
    id: SubscriberId,
    receiver: Option<broadcast::Receiver<T>>,
    closed: watch::Receiver<bool>,
    policy: OverflowPolicy,
    dropped: u64,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: broadcast::Receiver<T>,
        closed: watch::Receiver<bool>,
        policy: OverflowPolicy,
    ) -> Self {
        Self {
            id,
            receiver: Some(receiver),
            closed,
            policy,
            dropped: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receive the next value.
    ///
    /// # Returns
    ///
    /// - `Some(value)` - The next value
    /// - `None` - The subscription ended (lag under `Disconnect`, shutdown,
    ///   or the registry was dropped and everything was drained)
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let receiver = self.receiver.as_mut()?;
            let result = tokio::select! {
                biased;
                Ok(_) = self.closed.wait_for(|closed| *closed) => None,
                result = receiver.recv() => Some(result),
            };
            match result {
                None | Some(Err(RecvError::Closed)) => {
                    self.end();
                    return None;
                }
                Some(Ok(value)) => return Some(value),
                Some(Err(RecvError::Lagged(missed))) => {
                    if !self.lagged(missed) {
                        return None;
                    }
                }
            }
        }
    }

    /// Take the next value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        if *self.closed.borrow() {
            self.end();
        }
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.end();
                    return None;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    if !self.lagged(missed) {
                        return None;
                    }
                }
            }
        }
    }

    /// Values this subscriber missed by falling behind.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }

    /// Account for `missed` values. Returns whether the subscription goes on.
    fn lagged(&mut self, missed: u64) -> bool {
        self.dropped += missed;
        match self.policy {
            OverflowPolicy::DropOldest => {
                debug!(subscriber = self.id.0, missed, "Subscriber lagged, oldest events dropped");
                true
            }
            OverflowPolicy::Disconnect => {
                warn!(subscriber = self.id.0, missed, "Subscriber disconnected after falling behind");
                self.end();
                false
            }
        }
    }

    fn end(&mut self) {
        if self.receiver.take().is_some() {
            debug!(subscriber = self.id.0, "Subscription ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::publisher::{BroadcastRegistry, EventPublisher};
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_drop_deregisters() {
        let bus: BroadcastRegistry<u8> = BroadcastRegistry::new();
        let sub = bus.subscribe();
        let other = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
        assert_ne!(sub.id(), other.id());

        drop(sub);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(1), 1);
    }

    #[test]
    fn test_pending_recv_is_woken_by_publish() {
        let bus: BroadcastRegistry<u32> = BroadcastRegistry::new();
        let mut sub = bus.subscribe();
        let mut recv = task::spawn(sub.recv());
        assert_pending!(recv.poll());

        bus.publish(7);
        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), Some(7));
    }

    #[test]
    fn test_pending_recv_is_woken_by_close_all() {
        let bus: BroadcastRegistry<u32> = BroadcastRegistry::new();
        let mut sub = bus.subscribe();
        let mut recv = task::spawn(sub.recv());
        assert_pending!(recv.poll());

        bus.close_all();
        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), None);
    }

    #[tokio::test]
    async fn test_subscription_drains_after_registry_is_dropped() {
        let bus: BroadcastRegistry<u8> = BroadcastRegistry::new();
        let mut sub = bus.subscribe();
        bus.publish(5);
        drop(bus);

        assert!(!sub.is_closed());
        assert_eq!(sub.recv().await, Some(5));
        assert_eq!(sub.recv().await, None);
        assert!(sub.is_closed());
    }
}
