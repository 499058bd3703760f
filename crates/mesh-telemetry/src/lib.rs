//! # Mesh Telemetry
//!
//! Observability for the order mesh node.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber`, either as
//!   human-readable lines or as JSON for log shippers.
//! - **Metrics**: Prometheus counters and gauges, scraped from the RPC
//!   server's `/metrics` route.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mesh_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MESH_LOG_LEVEL` | `info` | Log filter directive (falls back to `RUST_LOG`) |
//! | `MESH_JSON_LOGS` | `false` | Emit JSON lines instead of pretty output |
//! | `MESH_SERVICE_NAME` | `order-mesh` | Service name attached to logs |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_text, register_metrics, ORDERS_RECEIVED, ORDERS_REJECTED, ORDERS_STORED, ORDER_EVENTS,
    PEERS_CONNECTED, SNAPSHOTS_ACTIVE, SUBSCRIBER_EVENTS_DROPPED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register all metrics.
///
/// Call once at process start. Subsequent calls fail with
/// [`TelemetryError::LoggingInit`] because the global subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)?;
    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}

/// Log a subsystem event with a consistent `subsystem` field.
#[macro_export]
macro_rules! log_event {
    ($level:ident, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a peer-related event with standard fields.
#[macro_export]
macro_rules! log_peer_event {
    ($level:ident, $msg:expr, $peer_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = "p2p",
            peer_id = %$peer_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log an order-related event with standard fields.
#[macro_export]
macro_rules! log_order_event {
    ($level:ident, $subsystem:expr, $msg:expr, $order_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            order_hash = %$order_hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Record a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
