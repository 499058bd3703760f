//! Peer network configuration.

use crate::domain::address::addr_infos_from_list;
use crate::events::NetworkError;
use serde::{Deserialize, Serialize};
use shared_types::humantime_serde;
use std::net::SocketAddr;
use std::time::Duration;

/// Public bootstrap nodes used when no list is configured.
///
/// The last two are community nodes provided on a best-effort basis.
#[must_use]
pub fn default_bootstrap_list() -> Vec<String> {
    [
        "/dns4/mesh-bootstrap.injective.dev/tcp/40558/ipfs/16Uiu2HAm2VAoigVxsZy1i5anRc1DdkCpDAJRkqQZh6j3wsPcH2Pb",
        "/dns4/mesh-bootstrap.injective.dev/tcp/40559/ws/ipfs/16Uiu2HAm2VAoigVxsZy1i5anRc1DdkCpDAJRkqQZh6j3wsPcH2Pb",
        "/ip4/34.201.54.78/tcp/4001/ipfs/12D3KooWHwJDdbx73qiBpSCJfg4RuYyzqnLUwfLBqzn77TSy7kRX",
        "/ip4/18.204.221.103/tcp/4001/ipfs/12D3KooWQS6Gsr2kLZvF7DVtoRFtj24aar5jvz88LvJePrawM3EM",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the peer listener binds to.
    pub listen_addr: SocketAddr,

    pub bootstrap_list: Vec<String>,

    /// Dial the bootstrap list on startup.
    pub use_bootstrap_list: bool,

    /// Shared deadline for one bootstrap round, and the bound on a single
    /// AddPeer or discovery dial.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Pause after the bootstrap round before it is reported complete.
    #[serde(with = "humantime_serde")]
    pub bootstrap_grace: Duration,

    #[serde(with = "humantime_serde")]
    pub publish_timeout: Duration,

    /// Discovery stops dialing once this many peers are connected.
    pub max_peers: usize,

    #[serde(with = "humantime_serde")]
    pub discovery_interval: Duration,

    /// Order hashes remembered for duplicate suppression.
    pub seen_cache_size: usize,

    /// Largest accepted wire frame, in bytes.
    pub max_message_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 60558)),
            bootstrap_list: default_bootstrap_list(),
            use_bootstrap_list: true,
            connect_timeout: Duration::from_secs(20),
            bootstrap_grace: Duration::from_secs(2),
            publish_timeout: Duration::from_secs(5),
            max_peers: 50,
            discovery_interval: Duration::from_secs(30),
            seen_cache_size: 10_000,
            max_message_size: 512 * 1024,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), NetworkError> {
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("publish_timeout", self.publish_timeout),
            ("discovery_interval", self.discovery_interval),
        ] {
            if value.is_zero() {
                return Err(NetworkError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        if self.max_peers == 0 {
            return Err(NetworkError::InvalidConfig("max_peers must be > 0".into()));
        }
        if self.seen_cache_size == 0 {
            return Err(NetworkError::InvalidConfig("seen_cache_size must be > 0".into()));
        }
        if self.max_message_size < 1024 {
            return Err(NetworkError::InvalidConfig("max_message_size must be at least 1 KiB".into()));
        }
        if self.use_bootstrap_list {
            addr_infos_from_list(&self.bootstrap_list)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr.port(), 60558);
        assert_eq!(config.bootstrap_list.len(), 4);
        assert_eq!(config.max_message_size, 524_288);
    }

    #[test]
    fn test_invalid_values() {
        let config = NetworkConfig {
            max_peers: 0,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NetworkConfig {
            connect_timeout: Duration::ZERO,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_bootstrap_entry_is_rejected_only_when_used() {
        let mut config = NetworkConfig {
            bootstrap_list: vec!["/ip4/not-an-ip/tcp/1/p2p/x".into()],
            ..NetworkConfig::default()
        };
        assert!(matches!(config.validate(), Err(NetworkError::Address(_))));
        config.use_bootstrap_list = false;
        assert!(config.validate().is_ok());
    }
}
