//! # Order Watcher Service
//!
//! One coordinating loop owns the live order set. Every admission, head,
//! query and timer tick reaches it as a message, so order state is never
//! mutated from anywhere else.
//!
//! ```text
//!  WatcherHandle ──► mpsc ──► ┌──────────────────────────┐ ──► BroadcastRegistry
//!  HeadPoller    ──►          │ OrderWatcher loop        │       (order event batches)
//!  timers (expiry, sweep) ──► │  orders / expirations /  │
//!                             │  in-flight re-validation │
//!  spawned re-validation ───► └──────────────────────────┘
//!     (RevalidationDone)
//! ```
//!
//! Each cycle publishes its events as one batch, then mutates the set, then
//! replies. A subscriber therefore sees a transition before any query can
//! observe it.

use crate::domain::config::WatcherConfig;
use crate::domain::entities::{WatchedOrder, WatcherStats};
use crate::domain::expiration::ExpirationIndex;
use crate::domain::scoping::affected_orders;
use crate::domain::transitions::{next_action, Action, Verdict};
use crate::events::{WatcherError, WatcherLogEvent};
use crate::ports::inbound::OrderWatcherApi;
use crate::ports::outbound::{OrderValidationApi, TimeSource};
use async_trait::async_trait;
use mesh_02_ethereum::BlockHeader;
use mesh_telemetry::{metric_inc, ORDERS_REJECTED, ORDERS_STORED, ORDER_EVENTS};
use shared_bus::{BroadcastRegistry, EventPublisher, Subscription};
use shared_types::{
    ContractEvent, EndState, LatestBlock, OrderEvent, OrderHash, OrderInfo, RejectedOrderCode, RejectedOrderInfo,
    SignedOrder, ValidationResponse, U256,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{info, instrument};

// =============================================================================
// COMMANDS
// =============================================================================

enum WatcherCommand {
    AddOrders {
        orders: Vec<SignedOrder>,
        reply: oneshot::Sender<ValidationResponse>,
    },
    NewHead {
        header: BlockHeader,
        events: Vec<ContractEvent>,
        reply: oneshot::Sender<()>,
    },
    RevalidationDone {
        batch: Vec<(OrderHash, Vec<ContractEvent>)>,
        response: ValidationResponse,
    },
    CurrentHashes {
        reply: oneshot::Sender<Vec<OrderHash>>,
    },
    OrderInfos {
        hashes: Vec<OrderHash>,
        reply: oneshot::Sender<Vec<OrderInfo>>,
    },
    Stats {
        reply: oneshot::Sender<WatcherStats>,
    },
}

/// A pending mutation of the order set.
enum Change {
    Insert(WatchedOrder),
    Apply {
        hash: OrderHash,
        action: Action,
        contract_events: Vec<ContractEvent>,
    },
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable client of the watcher loop.
#[derive(Clone)]
pub struct WatcherHandle {
    commands: mpsc::Sender<WatcherCommand>,
    events: BroadcastRegistry<Vec<OrderEvent>>,
}

impl WatcherHandle {
    async fn request<T, F>(&self, build: F) -> Result<T, WatcherError>
    where
        T: Send,
        F: FnOnce(oneshot::Sender<T>) -> WatcherCommand + Send,
    {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| WatcherError::Stopped)?;
        response.await.map_err(|_| WatcherError::Stopped)
    }
}

#[async_trait]
impl OrderWatcherApi for WatcherHandle {
    async fn add_orders(&self, orders: Vec<SignedOrder>) -> Result<ValidationResponse, WatcherError> {
        self.request(|reply| WatcherCommand::AddOrders { orders, reply }).await
    }

    async fn current_hashes(&self) -> Result<Vec<OrderHash>, WatcherError> {
        self.request(|reply| WatcherCommand::CurrentHashes { reply }).await
    }

    async fn order_infos(&self, hashes: Vec<OrderHash>) -> Result<Vec<OrderInfo>, WatcherError> {
        self.request(|reply| WatcherCommand::OrderInfos { hashes, reply }).await
    }

    async fn stats(&self) -> Result<WatcherStats, WatcherError> {
        self.request(|reply| WatcherCommand::Stats { reply }).await
    }

    async fn new_head(&self, header: BlockHeader, events: Vec<ContractEvent>) -> Result<(), WatcherError> {
        self.request(|reply| WatcherCommand::NewHead { header, events, reply })
            .await
    }

    fn subscribe(&self) -> Subscription<Vec<OrderEvent>> {
        self.events.subscribe()
    }
}

// =============================================================================
// LOOP
// =============================================================================

/// The watcher loop. Create with [`OrderWatcher::new`], then spawn
/// [`OrderWatcher::run`].
pub struct OrderWatcher {
    core: WatcherCore,
    commands: mpsc::Receiver<WatcherCommand>,
}

struct WatcherCore {
    config: WatcherConfig,
    validator: Arc<dyn OrderValidationApi>,
    clock: Arc<dyn TimeSource>,
    events: BroadcastRegistry<Vec<OrderEvent>>,
    /// Spawned re-validations report back through this.
    loopback: mpsc::WeakSender<WatcherCommand>,
    orders: BTreeMap<OrderHash, WatchedOrder>,
    expirations: ExpirationIndex,
    in_flight: HashSet<OrderHash>,
    /// Triggers that arrived while their hash was in flight.
    rerun: HashMap<OrderHash, Vec<ContractEvent>>,
    latest_block: LatestBlock,
}

impl OrderWatcher {
    /// Build the loop and its handle. Order event batches are published to
    /// `events`.
    pub fn new(
        config: WatcherConfig,
        validator: Arc<dyn OrderValidationApi>,
        clock: Arc<dyn TimeSource>,
        events: BroadcastRegistry<Vec<OrderEvent>>,
    ) -> Result<(Self, WatcherHandle), WatcherError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.command_buffer);
        let core = WatcherCore {
            config,
            validator,
            clock,
            events: events.clone(),
            loopback: tx.downgrade(),
            orders: BTreeMap::new(),
            expirations: ExpirationIndex::new(),
            in_flight: HashSet::new(),
            rerun: HashMap::new(),
            latest_block: LatestBlock::default(),
        };
        let handle = WatcherHandle { commands: tx, events };
        Ok((Self { core, commands: rx }, handle))
    }

    /// Run until `shutdown` fires or every handle is dropped. Closes all
    /// subscriptions on exit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let OrderWatcher {
            mut core,
            mut commands,
        } = self;

        let mut expiration_tick = interval(core.config.expiration_check_interval);
        expiration_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let sweep_every = core.config.sweep_interval;
        let mut sweep_tick = interval_at(Instant::now() + sweep_every, sweep_every);
        sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            expiration_check_interval = ?core.config.expiration_check_interval,
            sweep_interval = ?sweep_every,
            "order watcher started"
        );

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => core.handle(command).await,
                    None => break,
                },
                _ = expiration_tick.tick() => core.check_expirations(),
                _ = sweep_tick.tick() => core.sweep(),
                _ = shutdown.changed() => break,
            }
        }

        core.events.close_all();
        WatcherLogEvent::Stopped {
            orders: core.orders.len(),
        }
        .emit();
    }
}

impl WatcherCore {
    async fn handle(&mut self, command: WatcherCommand) {
        match command {
            WatcherCommand::AddOrders { orders, reply } => {
                let response = self.admit(orders).await;
                let _ = reply.send(response);
            }
            WatcherCommand::NewHead { header, events, reply } => {
                self.process_head(&header, &events);
                let _ = reply.send(());
            }
            WatcherCommand::RevalidationDone { batch, response } => {
                self.apply_revalidation(batch, response);
            }
            WatcherCommand::CurrentHashes { reply } => {
                let hashes = self
                    .orders
                    .values()
                    .filter(|order| order.is_visible())
                    .map(WatchedOrder::hash)
                    .collect();
                let _ = reply.send(hashes);
            }
            WatcherCommand::OrderInfos { hashes, reply } => {
                let infos = hashes
                    .iter()
                    .filter_map(|hash| self.orders.get(hash))
                    .filter(|order| order.is_visible())
                    .map(|order| order.info.clone())
                    .collect();
                let _ = reply.send(infos);
            }
            WatcherCommand::Stats { reply } => {
                let _ = reply.send(WatcherStats {
                    num_orders: self.visible_count(),
                    num_orders_including_hidden: self.orders.len(),
                    latest_block: self.latest_block,
                });
            }
        }
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    async fn admit(&mut self, orders: Vec<SignedOrder>) -> ValidationResponse {
        let submitted = orders.len();
        let mut response = ValidationResponse::default();
        let mut seen = HashSet::new();
        let mut repeats = Vec::new();
        let mut fresh = Vec::new();
        let mut already_watched = 0;

        for order in orders {
            let hash = order.hash();
            if !seen.insert(hash) {
                repeats.push(order);
                continue;
            }
            match self.orders.get(&hash) {
                Some(watched) if watched.is_visible() => {
                    already_watched += 1;
                    response.accepted.push(watched.info.clone());
                }
                Some(_) => {
                    already_watched += 1;
                    response
                        .rejected
                        .push(RejectedOrderInfo::new(order, RejectedOrderCode::OrderUnfunded));
                }
                None => fresh.push(order),
            }
        }

        let mut changes = Vec::new();
        if !fresh.is_empty() {
            let verdicts = self.validator.validate_orders(fresh).await;
            for rejected in &verdicts.rejected {
                metric_inc!(ORDERS_REJECTED, &[rejected.code().to_string().as_str()]);
            }
            for info in verdicts.accepted {
                changes.push(Change::Insert(WatchedOrder::new(info.clone())));
                response.accepted.push(info);
            }
            response.rejected.extend(verdicts.rejected);
        }

        // A hash submitted twice gets the verdict of its first occurrence.
        for order in repeats {
            let hash = order.hash();
            if let Some(info) = response.accepted.iter().find(|info| info.order_hash == hash) {
                response.accepted.push(info.clone());
            } else if let Some(code) = response
                .rejected
                .iter()
                .find(|rejected| rejected.order_hash == hash)
                .map(RejectedOrderInfo::code)
            {
                response.rejected.push(RejectedOrderInfo::new(order, code));
            }
        }

        WatcherLogEvent::OrdersAdmitted {
            submitted,
            added: changes.len(),
            already_watched,
        }
        .emit();
        self.commit(changes);
        response
    }

    // =========================================================================
    // RE-VALIDATION
    // =========================================================================

    fn process_head(&mut self, header: &BlockHeader, events: &[ContractEvent]) {
        self.latest_block = LatestBlock::from(header);
        let affected = affected_orders(events, self.orders.values());
        WatcherLogEvent::HeadProcessed {
            number: header.number,
            events: events.len(),
            affected: affected.len(),
        }
        .emit();
        self.schedule(affected);
    }

    /// Start one re-validation for every target not already in flight.
    /// Targets already in flight are queued for a single rerun.
    fn schedule(&mut self, targets: HashMap<OrderHash, Vec<ContractEvent>>) {
        let mut batch = Vec::new();
        let mut orders = Vec::new();
        let mut coalesced = 0;

        for (hash, events) in targets {
            let Some(watched) = self.orders.get(&hash) else {
                continue;
            };
            if self.in_flight.contains(&hash) {
                self.rerun.entry(hash).or_default().extend(events);
                coalesced += 1;
                continue;
            }
            self.in_flight.insert(hash);
            orders.push(watched.info.signed_order.clone());
            batch.push((hash, events));
        }

        if batch.is_empty() && coalesced == 0 {
            return;
        }
        WatcherLogEvent::RevalidationScheduled {
            orders: batch.len(),
            coalesced,
        }
        .emit();
        if batch.is_empty() {
            return;
        }

        let validator = Arc::clone(&self.validator);
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let response = validator.validate_orders(orders).await;
            if let Some(commands) = loopback.upgrade() {
                let _ = commands
                    .send(WatcherCommand::RevalidationDone { batch, response })
                    .await;
            }
        });
    }

    fn apply_revalidation(&mut self, batch: Vec<(OrderHash, Vec<ContractEvent>)>, response: ValidationResponse) {
        let mut verdicts: HashMap<OrderHash, Verdict> = HashMap::with_capacity(batch.len());
        for info in &response.accepted {
            verdicts.insert(info.order_hash, Verdict::Accepted(info.fillable_taker_asset_amount));
        }
        for rejected in &response.rejected {
            verdicts.insert(rejected.order_hash, Verdict::Rejected(rejected.code()));
        }

        let now = self.clock.now();
        let mut changes = Vec::new();
        let mut reruns = HashMap::new();
        for (hash, contract_events) in batch {
            self.in_flight.remove(&hash);
            if let Some(pending) = self.rerun.remove(&hash) {
                reruns.insert(hash, pending);
            }
            // Removed while the validation was outstanding.
            let (Some(watched), Some(verdict)) = (self.orders.get(&hash), verdicts.get(&hash)) else {
                continue;
            };
            let action = next_action(watched, *verdict, &contract_events, now);
            if action != Action::None {
                changes.push(Change::Apply {
                    hash,
                    action,
                    contract_events,
                });
            }
        }

        self.commit(changes);
        self.schedule(reruns);
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    fn check_expirations(&mut self) {
        let expired = self.expirations.drain_expired(self.clock.now());
        if expired.is_empty() {
            return;
        }
        let changes = expired
            .into_iter()
            .map(|hash| Change::Apply {
                hash,
                action: Action::Remove(EndState::Expired),
                contract_events: Vec::new(),
            })
            .collect();
        self.commit(changes);
    }

    /// Stop watching orders unfunded beyond the grace period, then
    /// re-validate everything left.
    fn sweep(&mut self) {
        let now = self.clock.now();
        let grace = self.config.unfunded_grace.as_secs();
        let stale: Vec<Change> = self
            .orders
            .values()
            .filter(|order| {
                order
                    .unfunded_since
                    .is_some_and(|since| now.saturating_sub(since) >= grace)
            })
            .map(|order| Change::Apply {
                hash: order.hash(),
                action: Action::Remove(EndState::StoppedWatching),
                contract_events: Vec::new(),
            })
            .collect();
        self.commit(stale);

        let everything = self.orders.keys().map(|hash| (*hash, Vec::new())).collect();
        self.schedule(everything);
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    /// Publish the events of `changes` as one batch, then apply them.
    fn commit(&mut self, changes: Vec<Change>) {
        if changes.is_empty() {
            return;
        }

        let mut batch = Vec::new();
        for change in &changes {
            match change {
                Change::Insert(order) => batch.push(order_event(
                    &order.info,
                    EndState::Added,
                    order.info.fillable_taker_asset_amount,
                    Vec::new(),
                )),
                Change::Apply {
                    hash,
                    action,
                    contract_events,
                } => {
                    let Some(order) = self.orders.get(hash) else {
                        continue;
                    };
                    match action {
                        Action::Remove(end_state) => batch.push(order_event(
                            &order.info,
                            *end_state,
                            U256::zero(),
                            contract_events.clone(),
                        )),
                        Action::Update {
                            end_state, fillable, ..
                        } => batch.push(order_event(&order.info, *end_state, *fillable, contract_events.clone())),
                        Action::Silent { .. } | Action::None => {}
                    }
                }
            }
        }

        if !batch.is_empty() {
            for event in &batch {
                metric_inc!(ORDER_EVENTS, &[event.end_state.as_label()]);
                WatcherLogEvent::OrderTransition {
                    order_hash: event.order_hash,
                    end_state: event.end_state,
                }
                .emit();
            }
            self.events.publish(batch);
        }

        for change in changes {
            match change {
                Change::Insert(order) => {
                    self.expirations.insert(order.hash(), order.expiration());
                    self.orders.insert(order.hash(), order);
                }
                Change::Apply { hash, action, .. } => match action {
                    Action::Remove(_) => {
                        if let Some(order) = self.orders.remove(&hash) {
                            self.expirations.remove(hash, order.expiration());
                        }
                        self.rerun.remove(&hash);
                    }
                    Action::Update {
                        fillable,
                        unfunded_since,
                        ..
                    } => {
                        if let Some(order) = self.orders.get_mut(&hash) {
                            order.info.fillable_taker_asset_amount = fillable;
                            order.unfunded_since = unfunded_since;
                        }
                    }
                    Action::Silent { fillable } => {
                        if let Some(order) = self.orders.get_mut(&hash) {
                            order.info.fillable_taker_asset_amount = fillable;
                        }
                    }
                    Action::None => {}
                },
            }
        }

        ORDERS_STORED.set(self.visible_count() as f64);
    }

    fn visible_count(&self) -> usize {
        self.orders.values().filter(|order| order.is_visible()).count()
    }
}

fn order_event(info: &OrderInfo, end_state: EndState, fillable: U256, contract_events: Vec<ContractEvent>) -> OrderEvent {
    OrderEvent {
        order_hash: info.order_hash,
        signed_order: info.signed_order.clone(),
        end_state,
        fillable_taker_asset_amount: fillable,
        contract_events,
    }
}
