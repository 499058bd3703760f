//! Watcher configuration.

use crate::events::WatcherError;
use serde::{Deserialize, Serialize};
use shared_types::humantime_serde;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Capacity of the command channel into the watcher loop.
    pub command_buffer: usize,

    /// How often expiration times are checked.
    #[serde(with = "humantime_serde")]
    pub expiration_check_interval: Duration,

    /// How often every order is re-validated and stale unfunded orders are
    /// dropped.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// How often the ledger head is polled.
    #[serde(with = "humantime_serde")]
    pub block_poll_interval: Duration,

    /// Most blocks walked in one poll when the head jumps ahead.
    pub max_block_backfill: u64,

    /// How long an unfunded order is kept before it stops being watched.
    #[serde(with = "humantime_serde")]
    pub unfunded_grace: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            command_buffer: 256,
            expiration_check_interval: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(300),
            block_poll_interval: Duration::from_secs(5),
            max_block_backfill: 64,
            unfunded_grace: Duration::from_secs(300),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<(), WatcherError> {
        if self.command_buffer == 0 {
            return Err(WatcherError::InvalidConfig("command_buffer must be > 0".into()));
        }
        for (name, value) in [
            ("expiration_check_interval", self.expiration_check_interval),
            ("sweep_interval", self.sweep_interval),
            ("block_poll_interval", self.block_poll_interval),
        ] {
            if value.is_zero() {
                return Err(WatcherError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        if self.max_block_backfill == 0 {
            return Err(WatcherError::InvalidConfig("max_block_backfill must be > 0".into()));
        }
        Ok(())
    }
}
