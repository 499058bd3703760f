//! Prometheus metrics for the order mesh.
//!
//! All metrics follow the naming convention: `mesh_<metric>[_total]`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., orders_received_total)
//! - **Gauge**: Value that can go up or down (e.g., orders_stored)

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ORDER WATCHER
    // =========================================================================

    /// Orders currently in the watched set
    pub static ref ORDERS_STORED: Gauge = Gauge::new(
        "mesh_orders_stored",
        "Number of orders currently watched"
    ).expect("metric creation failed");

    /// Orders offered to the node, by source
    pub static ref ORDERS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("mesh_orders_received_total", "Orders received for validation"),
        &["source"]  // source: rpc, p2p
    ).expect("metric creation failed");

    /// Orders rejected, by rejection code
    pub static ref ORDERS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("mesh_orders_rejected_total", "Orders rejected during validation"),
        &["code"]
    ).expect("metric creation failed");

    /// Order events emitted, by end state
    pub static ref ORDER_EVENTS: CounterVec = CounterVec::new(
        Opts::new("mesh_order_events_total", "Order lifecycle events emitted"),
        &["end_state"]
    ).expect("metric creation failed");

    // =========================================================================
    // PEER NETWORK
    // =========================================================================

    /// Currently connected peers
    pub static ref PEERS_CONNECTED: Gauge = Gauge::new(
        "mesh_peers_connected",
        "Number of connected peers"
    ).expect("metric creation failed");

    // =========================================================================
    // RPC
    // =========================================================================

    /// Live snapshots
    pub static ref SNAPSHOTS_ACTIVE: Gauge = Gauge::new(
        "mesh_snapshots_active",
        "Number of live order snapshots"
    ).expect("metric creation failed");

    /// Events lost to slow subscribers
    pub static ref SUBSCRIBER_EVENTS_DROPPED: Counter = Counter::new(
        "mesh_subscriber_events_dropped_total",
        "Events skipped by subscribers that fell behind the broadcast buffer"
    ).expect("metric creation failed");
}

/// Register every mesh metric with [`REGISTRY`].
///
/// Registering twice reports the duplicate as an error; callers at process
/// start may treat that as fatal.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ORDERS_STORED.clone()),
        Box::new(ORDERS_RECEIVED.clone()),
        Box::new(ORDERS_REJECTED.clone()),
        Box::new(ORDER_EVENTS.clone()),
        Box::new(PEERS_CONNECTED.clone()),
        Box::new(SNAPSHOTS_ACTIVE.clone()),
        Box::new(SUBSCRIBER_EVENTS_DROPPED.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(())
}

/// Render the registry in the Prometheus text exposition format.
pub fn gather_text() -> Result<String, TelemetryError> {
    let metric_families = REGISTRY.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
