//! # Snapshots
//!
//! A snapshot freezes the membership and order of the order set. Amounts are
//! never frozen; pages resolve hashes to live [`OrderInfo`] values at read
//! time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{OrderHash, OrderInfo};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Snapshot identifier. A random UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied id. Anything that is not a UUID is simply not
    /// a known snapshot.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frozen, ordered hash sequence.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub hashes: Arc<[OrderHash]>,
    pub last_access: Instant,
}

impl Snapshot {
    #[must_use]
    pub fn new(mut hashes: Vec<OrderHash>) -> Self {
        hashes.sort();
        hashes.dedup();
        Self {
            id: SnapshotId::new(),
            created_at: Utc::now(),
            hashes: hashes.into(),
            last_access: Instant::now(),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_access) >= ttl
    }
}

/// Hashes of zero-based `page`. Empty past the end.
#[must_use]
pub fn page_of(hashes: &[OrderHash], page: usize, per_page: usize) -> &[OrderHash] {
    let start = page.saturating_mul(per_page);
    if start >= hashes.len() {
        return &[];
    }
    let end = start.saturating_add(per_page).min(hashes.len());
    &hashes[start..end]
}

/// One page of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOrdersResponse {
    #[serde(rename = "snapshotID")]
    pub snapshot_id: SnapshotId,
    /// RFC 3339, UTC.
    #[serde(rename = "snapshotTimestamp")]
    pub snapshot_timestamp: DateTime<Utc>,
    #[serde(rename = "ordersInfos")]
    pub orders_infos: Vec<OrderInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Hash;

    fn hashes(n: u8) -> Vec<OrderHash> {
        (0..n).rev().map(|i| Hash([i; 32])).collect()
    }

    #[test]
    fn test_hashes_sorted_ascending() {
        let snapshot = Snapshot::new(hashes(4));
        assert_eq!(snapshot.hashes.first(), Some(&Hash([0; 32])));
        assert_eq!(snapshot.hashes.last(), Some(&Hash([3; 32])));
    }

    #[test]
    fn test_paging() {
        let snapshot = Snapshot::new(hashes(7));
        assert_eq!(page_of(&snapshot.hashes, 0, 5).len(), 5);
        assert_eq!(page_of(&snapshot.hashes, 1, 5), &[Hash([5; 32]), Hash([6; 32])][..]);
        assert!(page_of(&snapshot.hashes, 2, 5).is_empty());
        assert!(page_of(&snapshot.hashes, usize::MAX, usize::MAX).is_empty());
    }

    #[test]
    fn test_expiry() {
        let snapshot = Snapshot::new(Vec::new());
        let ttl = Duration::from_secs(60);
        assert!(!snapshot.is_expired(snapshot.last_access, ttl));
        assert!(snapshot.is_expired(snapshot.last_access + ttl, ttl));
    }

    #[test]
    fn test_id_parse() {
        let id = SnapshotId::new();
        assert_eq!(SnapshotId::parse(&id.to_string()), Some(id));
        assert_eq!(SnapshotId::parse("not-a-snapshot"), None);
        assert_eq!(SnapshotId::parse(""), None);
    }

    #[test]
    fn test_response_field_names() {
        let id = SnapshotId::new();
        let response = GetOrdersResponse {
            snapshot_id: id,
            snapshot_timestamp: DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            orders_infos: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["snapshotID"], id.to_string());
        assert_eq!(json["snapshotTimestamp"], "2020-01-01T00:00:00Z");
        assert!(json["ordersInfos"].as_array().unwrap().is_empty());
    }
}
