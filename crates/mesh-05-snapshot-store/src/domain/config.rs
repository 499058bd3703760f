//! Snapshot store configuration.

use crate::events::SnapshotError;
use serde::{Deserialize, Serialize};
use shared_types::humantime_serde;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Inactivity after which a snapshot is discarded.
    #[serde(with = "humantime_serde")]
    pub snapshot_ttl: Duration,

    /// How often expired snapshots are collected.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,

    /// Largest accepted `perPage`.
    pub max_per_page: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(60),
            gc_interval: Duration::from_secs(10),
            max_per_page: 1000,
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.snapshot_ttl.is_zero() || self.gc_interval.is_zero() {
            return Err(SnapshotError::InvalidConfig(
                "snapshot_ttl and gc_interval must be > 0".into(),
            ));
        }
        if self.max_per_page == 0 {
            return Err(SnapshotError::InvalidConfig("max_per_page must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = SnapshotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshot_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let config = SnapshotConfig {
            max_per_page: 0,
            ..SnapshotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
