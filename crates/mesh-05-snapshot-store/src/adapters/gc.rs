//! Background snapshot collection.

use crate::service::SnapshotStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Collect expired snapshots every `gc_interval` until `shutdown` fires.
pub async fn gc_task(store: Arc<SnapshotStore>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(store.config().gc_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.collect_garbage();
            }
            _ = shutdown.changed() => break,
        }
    }
}
