//! # Snapshot Store Service
//!
//! Holds the active snapshot table and serves pages from it.
//!
//! The table is touched by page requests and by the GC task; every insert,
//! refresh and eviction goes through the `DashMap` entry locks. The frozen
//! hash sequence itself is shared as an `Arc<[OrderHash]>` and read without
//! locking.

use crate::domain::config::SnapshotConfig;
use crate::domain::snapshot::{page_of, GetOrdersResponse, Snapshot, SnapshotId};
use crate::events::{SnapshotError, SnapshotLogEvent};
use crate::ports::inbound::SnapshotApi;
use crate::ports::outbound::OrderSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mesh_telemetry::SNAPSHOTS_ACTIVE;
use shared_types::OrderHash;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

pub struct SnapshotStore {
    source: Arc<dyn OrderSource>,
    config: SnapshotConfig,
    snapshots: DashMap<SnapshotId, Snapshot>,
}

impl SnapshotStore {
    pub fn new(source: Arc<dyn OrderSource>, config: SnapshotConfig) -> Result<Self, SnapshotError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            snapshots: DashMap::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Drop snapshots idle for longer than the TTL. Returns how many were
    /// removed.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let before = self.snapshots.len();
        self.snapshots
            .retain(|_, snapshot| !snapshot.is_expired(now, self.config.snapshot_ttl));
        let active = self.snapshots.len();
        let removed = before.saturating_sub(active);
        SNAPSHOTS_ACTIVE.set(active as f64);
        if removed > 0 {
            SnapshotLogEvent::Collected { removed, active }.emit();
        }
        removed
    }

    /// Refresh and return a live snapshot, or evict it if it has expired.
    fn touch(&self, id: SnapshotId, now: Instant) -> Option<(SnapshotId, DateTime<Utc>, Arc<[OrderHash]>)> {
        let ttl = self.config.snapshot_ttl;
        {
            let mut entry = self.snapshots.get_mut(&id)?;
            if !entry.is_expired(now, ttl) {
                entry.last_access = now;
                return Some((entry.id, entry.created_at, Arc::clone(&entry.hashes)));
            }
        }
        self.snapshots.remove_if(&id, |_, snapshot| snapshot.is_expired(now, ttl));
        None
    }

    async fn take_snapshot(&self) -> Result<(SnapshotId, DateTime<Utc>, Arc<[OrderHash]>), SnapshotError> {
        let snapshot = Snapshot::new(self.source.current_hashes().await?);
        let taken = (snapshot.id, snapshot.created_at, Arc::clone(&snapshot.hashes));
        SnapshotLogEvent::Created {
            id: snapshot.id,
            orders: snapshot.hashes.len(),
        }
        .emit();
        self.snapshots.insert(snapshot.id, snapshot);
        SNAPSHOTS_ACTIVE.set(self.snapshots.len() as f64);
        Ok(taken)
    }
}

#[async_trait]
impl SnapshotApi for SnapshotStore {
    #[instrument(skip(self))]
    async fn get_orders(
        &self,
        page: usize,
        per_page: usize,
        snapshot_id: &str,
    ) -> Result<GetOrdersResponse, SnapshotError> {
        if per_page == 0 || per_page > self.config.max_per_page {
            return Err(SnapshotError::InvalidPerPage {
                per_page,
                max: self.config.max_per_page,
            });
        }

        let existing = SnapshotId::parse(snapshot_id).and_then(|id| self.touch(id, Instant::now()));
        let (id, created_at, hashes) = match existing {
            Some(found) => found,
            None => {
                if !snapshot_id.is_empty() {
                    SnapshotLogEvent::Replaced {
                        requested: snapshot_id.to_string(),
                    }
                    .emit();
                }
                self.take_snapshot().await?
            }
        };

        let wanted = page_of(&hashes, page, per_page).to_vec();
        let orders_infos = if wanted.is_empty() {
            Vec::new()
        } else {
            self.source.order_infos(wanted).await?
        };

        Ok(GetOrdersResponse {
            snapshot_id: id,
            snapshot_timestamp: created_at,
            orders_infos,
        })
    }
}
