//! Gateway configuration with validation.

use crate::domain::error::GatewayError;
use serde::{Deserialize, Serialize};
use shared_bus::OverflowPolicy;
use shared_types::humantime_serde;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Address the HTTP and WebSocket listener binds to.
    pub listen_addr: SocketAddr,

    /// Order event batches buffered per subscription.
    pub subscriber_buffer: usize,

    /// What happens to a subscription whose buffer is full.
    pub overflow_policy: OverflowPolicy,

    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,

    /// Largest accepted HTTP body or WebSocket message, in bytes.
    pub max_request_size: usize,

    /// Most calls in one batch request.
    pub max_batch_size: usize,

    /// Bound on a single HTTP request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Subscriptions one WebSocket connection may hold.
    pub max_subscriptions_per_connection: usize,

    pub cors: CorsConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 60557)),
            subscriber_buffer: 256,
            overflow_policy: OverflowPolicy::DropOldest,
            heartbeat_interval: Duration::from_secs(5),
            max_request_size: 2 * 1024 * 1024,
            max_batch_size: 100,
            request_timeout: Duration::from_secs(30),
            max_subscriptions_per_connection: 16,
            cors: CorsConfig::default(),
        }
    }
}

impl RpcConfig {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.subscriber_buffer == 0 {
            return Err(GatewayError::Config("subscriber_buffer cannot be 0".into()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(GatewayError::Config("heartbeat_interval cannot be 0".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(GatewayError::Config("request_timeout cannot be 0".into()));
        }
        if self.max_request_size == 0 {
            return Err(GatewayError::Config("max_request_size cannot be 0".into()));
        }
        if self.max_batch_size == 0 {
            return Err(GatewayError::Config("max_batch_size cannot be 0".into()));
        }
        if self.max_subscriptions_per_connection == 0 {
            return Err(GatewayError::Config(
                "max_subscriptions_per_connection cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Allowed origins; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Preflight cache lifetime in seconds.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            max_age: 3600,
        }
    }
}
