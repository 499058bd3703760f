//! # Head Poller
//!
//! Polls the ledger head and reports every new block, with its contract
//! events, to the watcher. Gaps are walked block by block up to
//! `max_block_backfill`; older blocks of a larger gap are skipped.

use crate::domain::config::WatcherConfig;
use crate::events::{WatcherError, WatcherLogEvent};
use crate::ports::inbound::OrderWatcherApi;
use crate::ports::outbound::LedgerClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

pub struct HeadPoller {
    ledger: Arc<dyn LedgerClient>,
    watcher: Arc<dyn OrderWatcherApi>,
    poll_interval: Duration,
    max_backfill: u64,
    last_processed: Option<u64>,
}

impl HeadPoller {
    pub fn new(ledger: Arc<dyn LedgerClient>, watcher: Arc<dyn OrderWatcherApi>, config: &WatcherConfig) -> Self {
        Self {
            ledger,
            watcher,
            poll_interval: config.block_poll_interval,
            max_backfill: config.max_block_backfill.max(1),
            last_processed: None,
        }
    }

    /// Number of the last block handed to the watcher.
    #[must_use]
    pub fn last_processed(&self) -> Option<u64> {
        self.last_processed
    }

    /// Deliver every block since the last poll. Returns how many were
    /// delivered.
    pub async fn poll_once(&mut self) -> Result<usize, WatcherError> {
        let head = self.ledger.latest_block().await?;
        let first = match self.last_processed {
            None => head.number,
            Some(last) if head.number <= last => return Ok(0),
            Some(last) => (last + 1).max(head.number.saturating_sub(self.max_backfill - 1)),
        };

        let mut delivered = 0;
        for number in first..=head.number {
            let header = if number == head.number {
                head
            } else {
                self.ledger.block_by_number(number).await?
            };
            let events = self.ledger.block_events(&header).await?;
            self.watcher.new_head(header, events).await?;
            self.last_processed = Some(number);
            delivered += 1;
        }
        debug!(head = head.number, delivered, "polled ledger head");
        Ok(delivered)
    }

    /// Poll until `shutdown` fires or the watcher stops. Ledger failures are
    /// logged and retried on the next tick.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => match self.poll_once().await {
                    Ok(_) => {}
                    Err(WatcherError::Stopped) => break,
                    Err(e) => WatcherLogEvent::PollFailed { error: e.to_string() }.emit(),
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!(last_processed = ?self.last_processed, "head poller stopped");
    }
}
