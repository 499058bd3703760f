//! Validator configuration.

use crate::events::ValidationError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{humantime_serde, u256_dec};
use std::time::Duration;

/// Largest accepted order, in JSON-encoded bytes.
pub const DEFAULT_MAX_ORDER_SIZE_BYTES: usize = 8192;

/// Validation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Orders whose JSON encoding exceeds this size are rejected.
    pub max_order_size_bytes: usize,

    /// Orders expiring later than this (unix seconds) are rejected.
    #[serde(with = "u256_dec")]
    pub max_expiration_time: U256,

    /// Orders per ledger query.
    pub ledger_batch_size: usize,

    /// Deadline for one ledger query.
    #[serde(with = "humantime_serde")]
    pub ledger_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_order_size_bytes: DEFAULT_MAX_ORDER_SIZE_BYTES,
            max_expiration_time: U256::MAX,
            ledger_batch_size: 500,
            ledger_timeout: Duration::from_secs(10),
        }
    }
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ledger_batch_size == 0 {
            return Err(ValidationError::InvalidConfig(
                "ledger_batch_size must be > 0".to_string(),
            ));
        }
        if self.ledger_timeout.is_zero() {
            return Err(ValidationError::InvalidConfig(
                "ledger_timeout must be > 0".to_string(),
            ));
        }
        if self.max_order_size_bytes == 0 {
            return Err(ValidationError::InvalidConfig(
                "max_order_size_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ValidatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger_batch_size, 500);
        assert_eq!(config.ledger_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = ValidatorConfig {
            ledger_batch_size: 0,
            ..ValidatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: ValidatorConfig =
            serde_json::from_str(r#"{"ledger_timeout":"250ms","max_expiration_time":"1000"}"#).unwrap();
        assert_eq!(config.ledger_timeout, Duration::from_millis(250));
        assert_eq!(config.max_expiration_time, U256::from(1000));
        assert_eq!(config.ledger_batch_size, 500);
    }
}
