//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! ## Loading Order
//!
//! 1. Built-in defaults
//! 2. The TOML file named by `MESH_CONFIG`, if set
//! 3. Environment overrides (`MESH_CHAIN_ID`, `MESH_P2P_LISTEN`, `MESH_RPC_ADDR`,
//!    `MESH_BOOTSTRAP_LIST`, `MESH_USE_BOOTSTRAP_LIST`, `MESH_VERSION`)
//!
//! Any section may be omitted from the file; missing fields keep their
//! defaults. Durations are written as `"20s"`, `"500ms"` or `"5m"`.

use mesh_01_peer_network::NetworkConfig;
use mesh_02_ethereum::{ContractAddressError, ContractAddressTable, ContractAddresses, GANACHE_CHAIN_ID};
use mesh_03_order_validation::ValidatorConfig;
use mesh_04_order_watcher::WatcherConfig;
use mesh_05_snapshot_store::SnapshotConfig;
use mesh_06_rpc_gateway::RpcConfig;
use mesh_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "MESH_CONFIG";

/// Version reported by `mesh_getStats` unless overridden.
pub const DEFAULT_VERSION: &str = "development";

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Reported node version.
    pub version: String,
    pub ethereum: EthereumConfig,
    pub network: NetworkConfig,
    pub validation: ValidatorConfig,
    pub watcher: WatcherConfig,
    pub snapshots: SnapshotConfig,
    pub rpc: RpcConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            ethereum: EthereumConfig::default(),
            network: NetworkConfig::default(),
            validation: ValidatorConfig::default(),
            watcher: WatcherConfig::default(),
            snapshots: SnapshotConfig::default(),
            rpc: RpcConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Ledger identity and contract addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    pub chain_id: u64,

    /// Replaces the built-in table for `chain_id`. Rejected on chain 1.
    pub custom_contract_addresses: Option<ContractAddresses>,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            chain_id: GANACHE_CHAIN_ID,
            custom_contract_addresses: None,
        }
    }
}

/// Configuration errors. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("invalid {section} configuration: {reason}")]
    Invalid { section: &'static str, reason: String },

    #[error(transparent)]
    Contracts(#[from] ContractAddressError),
}

impl NodeConfig {
    /// Defaults, then the `MESH_CONFIG` file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.telemetry.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `MESH_*` overrides. `lookup` returns the value of a variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MESH_CHAIN_ID") {
            self.ethereum.chain_id = parse_env("MESH_CHAIN_ID", value)?;
        }
        if let Some(value) = lookup("MESH_P2P_LISTEN") {
            self.network.listen_addr = parse_env("MESH_P2P_LISTEN", value)?;
        }
        if let Some(value) = lookup("MESH_RPC_ADDR") {
            self.rpc.listen_addr = parse_env("MESH_RPC_ADDR", value)?;
        }
        if let Some(value) = lookup("MESH_BOOTSTRAP_LIST") {
            self.network.bootstrap_list = value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup("MESH_USE_BOOTSTRAP_LIST") {
            self.network.use_bootstrap_list = match value.trim().to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::Env {
                        var: "MESH_USE_BOOTSTRAP_LIST",
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("MESH_VERSION") {
            self.version = value;
        }
        Ok(())
    }

    /// Check every section and resolve the contract addresses for the
    /// configured chain.
    pub fn validate(&self) -> Result<ContractAddresses, ConfigError> {
        self.network.validate().map_err(|e| invalid("network", e))?;
        self.validation.validate().map_err(|e| invalid("validation", e))?;
        self.watcher.validate().map_err(|e| invalid("watcher", e))?;
        self.snapshots.validate().map_err(|e| invalid("snapshots", e))?;
        self.rpc.validate().map_err(|e| invalid("rpc", e))?;
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid {
                section: "node",
                reason: "version cannot be empty".into(),
            });
        }

        let chain_id = self.ethereum.chain_id;
        let mut table = ContractAddressTable::new();
        if let Some(custom) = self.ethereum.custom_contract_addresses {
            table.add(chain_id, custom)?;
        }
        Ok(table.get(chain_id)?)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env { var, value })
}

fn invalid(section: &'static str, error: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        section,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Address;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    fn custom_addresses() -> ContractAddresses {
        ContractAddresses {
            exchange: Address([1; 20]),
            dev_utils: Address([2; 20]),
            erc20_proxy: Address([3; 20]),
            erc721_proxy: Address([4; 20]),
            erc1155_proxy: Address([5; 20]),
            ..ContractAddresses::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = NodeConfig::default();
        assert_eq!(config.version, "development");
        assert_eq!(config.ethereum.chain_id, GANACHE_CHAIN_ID);
        assert_eq!(config.validate().unwrap(), ContractAddresses::ganache());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NodeConfig::from_toml(
            r#"
            version = "1.2.3"

            [network]
            listen_addr = "127.0.0.1:7000"
            use_bootstrap_list = false

            [rpc]
            heartbeat_interval = "500ms"

            [snapshots]
            snapshot_ttl = "2m"
            "#,
        )
        .unwrap();
        assert_eq!(config.version, "1.2.3");
        assert_eq!(config.network.listen_addr.port(), 7000);
        assert!(!config.network.use_bootstrap_list);
        assert_eq!(config.rpc.heartbeat_interval, Duration::from_millis(500));
        assert_eq!(config.snapshots.snapshot_ttl, Duration::from_secs(120));
        assert_eq!(config.watcher.sweep_interval, WatcherConfig::default().sweep_interval);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ethereum]\nchain_id = 15001").unwrap();
        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ethereum.chain_id, 15001);
        assert!(config.validate().is_ok());

        let missing = NodeConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            NodeConfig::from_toml("[network\nlisten_addr = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        config
            .apply_overrides(env(&[
                ("MESH_CHAIN_ID", "15001"),
                ("MESH_P2P_LISTEN", "0.0.0.0:7001"),
                ("MESH_RPC_ADDR", "127.0.0.1:7002"),
                ("MESH_BOOTSTRAP_LIST", "/ip4/1.2.3.4/tcp/1/p2p/aa, ,/ip4/1.2.3.5/tcp/1/p2p/bb"),
                ("MESH_USE_BOOTSTRAP_LIST", "false"),
                ("MESH_VERSION", "v9"),
            ]))
            .unwrap();
        assert_eq!(config.ethereum.chain_id, 15001);
        assert_eq!(config.network.listen_addr.port(), 7001);
        assert_eq!(config.rpc.listen_addr.port(), 7002);
        assert_eq!(config.network.bootstrap_list.len(), 2);
        assert!(!config.network.use_bootstrap_list);
        assert_eq!(config.version, "v9");
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = NodeConfig::default();
        let err = config.apply_overrides(env(&[("MESH_CHAIN_ID", "mainnet")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "MESH_CHAIN_ID", .. }));

        let err = config
            .apply_overrides(env(&[("MESH_USE_BOOTSTRAP_LIST", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_custom_contracts() {
        let mut config = NodeConfig::default();
        config.ethereum.chain_id = 50;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Contracts(ContractAddressError::UnknownChain(50)))
        ));

        config.ethereum.custom_contract_addresses = Some(custom_addresses());
        assert_eq!(config.validate().unwrap(), custom_addresses());

        let mut incomplete = custom_addresses();
        incomplete.dev_utils = Address::default();
        config.ethereum.custom_contract_addresses = Some(incomplete);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Contracts(ContractAddressError::MissingRole { role: "DevUtils", .. }))
        ));

        config.ethereum.chain_id = 1;
        config.ethereum.custom_contract_addresses = Some(custom_addresses());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Contracts(ContractAddressError::MainnetImmutable))
        ));
    }

    #[test]
    fn test_invalid_section() {
        let mut config = NodeConfig::default();
        config.rpc.subscriber_buffer = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { section: "rpc", .. })
        ));
    }
}
