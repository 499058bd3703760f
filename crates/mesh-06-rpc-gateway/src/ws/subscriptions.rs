//! Subscription bookkeeping for WebSocket connections.
//!
//! Every subscription is a spawned task that forwards notifications into its
//! connection's outbound queue. Cancelling aborts the task; for order
//! subscriptions that drops the `shared-bus` [`Subscription`], which releases
//! its registry slot at once.

use crate::domain::error::{ApiError, ApiResult};
use crate::domain::types::{SubscriptionNotification, SubscriptionTopic, HEARTBEAT_TOKEN};
use crate::events::RpcLogEvent;
use axum::extract::ws::Message;
use dashmap::DashMap;
use mesh_telemetry::SUBSCRIBER_EVENTS_DROPPED;
use serde_json::Value;
use shared_bus::Subscription;
use shared_types::OrderEvent;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Subscription ID (hex string)
pub type SubscriptionId = String;

pub type ConnectionId = u64;

struct ActiveSubscription {
    connection_id: ConnectionId,
    topic: SubscriptionTopic,
    task: AbortHandle,
}

pub struct SubscriptionManager {
    subscriptions: DashMap<SubscriptionId, ActiveSubscription>,
    by_connection: DashMap<ConnectionId, Vec<SubscriptionId>>,
    id_counter: AtomicU64,
    connection_counter: AtomicU64,
    max_per_connection: usize,
    heartbeat_interval: Duration,
}

async fn notify(outbound: &mpsc::Sender<Message>, id: &str, result: Value) -> bool {
    let note = SubscriptionNotification::new(id, result);
    match serde_json::to_string(&note) {
        Ok(text) => outbound.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            debug!(subscription_id = %id, error = %e, "failed to encode notification");
            true
        }
    }
}

impl SubscriptionManager {
    pub fn new(max_per_connection: usize, heartbeat_interval: Duration) -> Self {
        Self {
            subscriptions: DashMap::new(),
            by_connection: DashMap::new(),
            id_counter: AtomicU64::new(1),
            connection_counter: AtomicU64::new(1),
            max_per_connection,
            heartbeat_interval,
        }
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.connection_counter.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Forward order event batches to the connection, one notification per
    /// batch.
    pub fn subscribe_orders(
        &self,
        connection_id: ConnectionId,
        mut source: Subscription<Vec<OrderEvent>>,
        outbound: mpsc::Sender<Message>,
    ) -> ApiResult<SubscriptionId> {
        self.register(connection_id, SubscriptionTopic::Orders, move |id| async move {
            loop {
                let missed = source.dropped();
                let next = source.recv().await;
                let lagged = source.dropped() - missed;
                if lagged > 0 {
                    SUBSCRIBER_EVENTS_DROPPED.inc_by(lagged as f64);
                }
                let Some(batch) = next else {
                    break;
                };
                let result = match serde_json::to_value(&batch) {
                    Ok(result) => result,
                    Err(e) => {
                        debug!(subscription_id = %id, error = %e, "failed to encode order events");
                        continue;
                    }
                };
                if !notify(&outbound, &id, result).await {
                    return;
                }
            }
            RpcLogEvent::SubscriptionEnded {
                id,
                topic: SubscriptionTopic::Orders,
            }
            .emit();
        })
    }

    /// Send the heartbeat token every `heartbeat_interval`.
    pub fn subscribe_heartbeat(
        &self,
        connection_id: ConnectionId,
        outbound: mpsc::Sender<Message>,
    ) -> ApiResult<SubscriptionId> {
        let period = self.heartbeat_interval;
        self.register(connection_id, SubscriptionTopic::Heartbeat, move |id| async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !notify(&outbound, &id, Value::String(HEARTBEAT_TOKEN.to_string())).await {
                    return;
                }
            }
        })
    }

    fn register<F, Fut>(&self, connection_id: ConnectionId, topic: SubscriptionTopic, task: F) -> ApiResult<SubscriptionId>
    where
        F: FnOnce(SubscriptionId) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut owned = self.by_connection.entry(connection_id).or_default();
        if owned.len() >= self.max_per_connection {
            return Err(ApiError::limit_exceeded(format!(
                "at most {} subscriptions per connection",
                self.max_per_connection
            )));
        }

        let id = format!("0x{:x}", self.id_counter.fetch_add(1, Ordering::Relaxed));
        let handle = tokio::spawn(task(id.clone()));
        self.subscriptions.insert(
            id.clone(),
            ActiveSubscription {
                connection_id,
                topic,
                task: handle.abort_handle(),
            },
        );
        owned.push(id.clone());

        RpcLogEvent::SubscriptionOpened { id: id.clone(), topic }.emit();
        Ok(id)
    }

    /// Cancel one subscription owned by `connection_id`.
    ///
    /// Returns `false` for unknown ids and ids owned by another connection.
    pub fn unsubscribe(&self, connection_id: ConnectionId, id: &str) -> bool {
        let Some((_, subscription)) = self
            .subscriptions
            .remove_if(id, |_, sub| sub.connection_id == connection_id)
        else {
            return false;
        };
        subscription.task.abort();
        if let Some(mut owned) = self.by_connection.get_mut(&connection_id) {
            owned.retain(|owned_id| owned_id != id);
        }
        debug!(subscription_id = %id, topic = subscription.topic.as_str(), "subscription cancelled");
        true
    }

    /// Cancel every subscription of a closed connection. Returns how many
    /// were cancelled.
    pub fn remove_connection(&self, connection_id: ConnectionId) -> usize {
        let Some((_, owned)) = self.by_connection.remove(&connection_id) else {
            return 0;
        };
        owned
            .iter()
            .filter_map(|id| self.subscriptions.remove(id))
            .map(|(_, subscription)| subscription.task.abort())
            .count()
    }

    /// Cancel everything. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let ids: Vec<SubscriptionId> = self.subscriptions.iter().map(|entry| entry.key().clone()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some((_, subscription)) = self.subscriptions.remove(&id) {
                subscription.task.abort();
                cancelled += 1;
            }
        }
        self.by_connection.clear();
        cancelled
    }
}
