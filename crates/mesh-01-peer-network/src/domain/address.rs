//! # Peer Addresses
//!
//! Self-describing peer addresses:
//!
//! ```text
//! /ip4/<a.b.c.d>/tcp/<port>[/ws]/(p2p|ipfs)/<peer id>
//! /ip6/<addr>/tcp/<port>[/ws]/(p2p|ipfs)/<peer id>
//! /dns4/<host>/tcp/<port>[/ws]/(p2p|ipfs)/<peer id>
//! ```
//!
//! The peer id component is optional when the id is carried separately, as
//! in a `PeerInfo` passed to AddPeer. Bootstrap entries must carry it.

use crate::domain::identity::PeerId;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")]
    Empty,

    #[error("address must start with '/': {0}")]
    NotAbsolute(String),

    #[error("unsupported protocol {0}")]
    UnknownProtocol(String),

    #[error("address is missing its {0} component")]
    MissingComponent(&'static str),

    #[error("invalid ip address {0}")]
    InvalidIp(String),

    #[error("invalid tcp port {0}")]
    InvalidPort(String),

    #[error("address has no peer id: {0}")]
    MissingPeerId(String),

    #[error("unexpected trailing component {0}")]
    Trailing(String),

    #[error("address names peer {found} but belongs to {expected}")]
    PeerIdMismatch { expected: PeerId, found: PeerId },
}

/// Network-layer host of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Ip4(Ipv4Addr),
    Ip6(Ipv6Addr),
    Dns4(String),
}

/// One parsed peer address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    pub host: Host,
    pub port: u16,
    pub websocket: bool,
    pub peer_id: Option<PeerId>,
}

impl PeerAddr {
    /// `host:port` for a plain TCP dial. `None` for websocket addresses.
    #[must_use]
    pub fn dial_target(&self) -> Option<String> {
        if self.websocket {
            return None;
        }
        Some(match &self.host {
            Host::Ip4(ip) => format!("{ip}:{}", self.port),
            Host::Ip6(ip) => format!("[{ip}]:{}", self.port),
            Host::Dns4(name) => format!("{name}:{}", self.port),
        })
    }

    /// The address without its peer id component.
    #[must_use]
    pub fn without_peer_id(&self) -> Self {
        Self {
            peer_id: None,
            ..self.clone()
        }
    }
}

impl FromStr for PeerAddr {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| AddressError::NotAbsolute(s.to_string()))?;
        let mut parts = rest.split('/');

        let protocol = parts.next().unwrap_or_default();
        let value = parts.next().ok_or(AddressError::MissingComponent("host"))?;
        let host = match protocol {
            "ip4" => Host::Ip4(value.parse().map_err(|_| AddressError::InvalidIp(value.to_string()))?),
            "ip6" => Host::Ip6(value.parse().map_err(|_| AddressError::InvalidIp(value.to_string()))?),
            "dns4" | "dns" if !value.is_empty() => Host::Dns4(value.to_string()),
            "dns4" | "dns" => return Err(AddressError::MissingComponent("host")),
            other => return Err(AddressError::UnknownProtocol(other.to_string())),
        };

        match parts.next() {
            Some("tcp") => {}
            Some(other) => return Err(AddressError::UnknownProtocol(other.to_string())),
            None => return Err(AddressError::MissingComponent("tcp")),
        }
        let port = parts.next().ok_or(AddressError::MissingComponent("port"))?;
        let port: u16 = port.parse().map_err(|_| AddressError::InvalidPort(port.to_string()))?;

        let mut next = parts.next();
        let websocket = next == Some("ws");
        if websocket {
            next = parts.next();
        }

        let peer_id = match next {
            None => None,
            Some("p2p") | Some("ipfs") => match parts.next() {
                Some(id) if !id.is_empty() => Some(PeerId::from(id)),
                _ => return Err(AddressError::MissingComponent("peer id")),
            },
            Some(other) => return Err(AddressError::UnknownProtocol(other.to_string())),
        };

        if let Some(extra) = parts.next() {
            return Err(AddressError::Trailing(extra.to_string()));
        }

        Ok(Self {
            host,
            port,
            websocket,
            peer_id,
        })
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Ip4(ip) => write!(f, "/ip4/{ip}")?,
            Host::Ip6(ip) => write!(f, "/ip6/{ip}")?,
            Host::Dns4(name) => write!(f, "/dns4/{name}")?,
        }
        write!(f, "/tcp/{}", self.port)?;
        if self.websocket {
            f.write_str("/ws")?;
        }
        if let Some(id) = &self.peer_id {
            write!(f, "/p2p/{id}")?;
        }
        Ok(())
    }
}

/// A peer and every address it can be reached at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrInfo {
    pub peer_id: PeerId,
    pub addrs: Vec<PeerAddr>,
}

impl AddrInfo {
    /// Build from an id plus addresses that may or may not repeat the id.
    pub fn from_parts<S: AsRef<str>>(peer_id: PeerId, addrs: &[S]) -> Result<Self, AddressError> {
        if addrs.is_empty() {
            return Err(AddressError::Empty);
        }
        let mut parsed = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let addr: PeerAddr = addr.as_ref().parse()?;
            if let Some(found) = &addr.peer_id {
                if *found != peer_id {
                    return Err(AddressError::PeerIdMismatch {
                        expected: peer_id,
                        found: found.clone(),
                    });
                }
            }
            parsed.push(addr.without_peer_id());
        }
        Ok(Self {
            peer_id,
            addrs: parsed,
        })
    }
}

/// Parse a bootstrap list, grouping addresses that share a peer id.
///
/// Groups keep the order in which their peer id first appears. Any malformed
/// entry fails the whole list.
pub fn addr_infos_from_list<S: AsRef<str>>(list: &[S]) -> Result<Vec<AddrInfo>, AddressError> {
    let mut infos: Vec<AddrInfo> = Vec::new();
    for entry in list {
        let entry = entry.as_ref();
        let addr: PeerAddr = entry.parse()?;
        let peer_id = addr
            .peer_id
            .clone()
            .ok_or_else(|| AddressError::MissingPeerId(entry.to_string()))?;
        let addr = addr.without_peer_id();
        match infos.iter_mut().find(|info| info.peer_id == peer_id) {
            Some(info) => {
                if !info.addrs.contains(&addr) {
                    info.addrs.push(addr);
                }
            }
            None => infos.push(AddrInfo {
                peer_id,
                addrs: vec![addr],
            }),
        }
    }
    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::default_bootstrap_list;
    use proptest::prelude::*;

    #[test]
    fn test_parse_ip4_with_ipfs() {
        let addr: PeerAddr = "/ip4/34.201.54.78/tcp/4001/ipfs/12D3KooWHwJD".parse().unwrap();
        assert_eq!(addr.host, Host::Ip4(Ipv4Addr::new(34, 201, 54, 78)));
        assert_eq!(addr.port, 4001);
        assert!(!addr.websocket);
        assert_eq!(addr.peer_id, Some(PeerId::from("12D3KooWHwJD")));
        assert_eq!(addr.dial_target().as_deref(), Some("34.201.54.78:4001"));
    }

    #[test]
    fn test_parse_dns_websocket() {
        let addr: PeerAddr = "/dns4/mesh.example/tcp/40559/ws/p2p/abc".parse().unwrap();
        assert_eq!(addr.host, Host::Dns4("mesh.example".into()));
        assert!(addr.websocket);
        assert_eq!(addr.dial_target(), None);
        assert_eq!(addr.to_string(), "/dns4/mesh.example/tcp/40559/ws/p2p/abc");
    }

    #[test]
    fn test_parse_ip6() {
        let addr: PeerAddr = "/ip6/::1/tcp/60558".parse().unwrap();
        assert_eq!(addr.dial_target().as_deref(), Some("[::1]:60558"));
        assert_eq!(addr.peer_id, None);
    }

    #[test]
    fn test_malformed_addresses() {
        let cases = [
            ("", AddressError::Empty),
            ("ip4/1.2.3.4/tcp/1", AddressError::NotAbsolute("ip4/1.2.3.4/tcp/1".into())),
            ("/ip4/1.2.3/tcp/1", AddressError::InvalidIp("1.2.3".into())),
            ("/ip4/1.2.3.4/udp/1", AddressError::UnknownProtocol("udp".into())),
            ("/ip4/1.2.3.4/tcp/70000", AddressError::InvalidPort("70000".into())),
            ("/ip4/1.2.3.4/tcp/1/p2p", AddressError::MissingComponent("peer id")),
            ("/ip4/1.2.3.4/tcp/1/p2p/a/b", AddressError::Trailing("b".into())),
            ("/quic/1.2.3.4", AddressError::UnknownProtocol("quic".into())),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<PeerAddr>(), Err(expected), "{input}");
        }
    }

    #[test]
    fn test_default_list_groups_by_peer() {
        let infos = addr_infos_from_list(&default_bootstrap_list()).unwrap();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].addrs.len(), 2);
        assert!(infos[0].addrs[1].websocket);
        assert!(infos.iter().all(|info| info.addrs.iter().all(|a| a.peer_id.is_none())));
    }

    #[test]
    fn test_list_requires_peer_ids() {
        let err = addr_infos_from_list(&["/ip4/1.2.3.4/tcp/1"]).unwrap_err();
        assert!(matches!(err, AddressError::MissingPeerId(_)));
    }

    #[test]
    fn test_one_bad_entry_fails_list() {
        let list = ["/ip4/1.2.3.4/tcp/1/p2p/a", "/ip4/nope/tcp/1/p2p/b"];
        assert!(addr_infos_from_list(&list).is_err());
    }

    #[test]
    fn test_addr_info_from_parts() {
        let id = PeerId::from("abc");
        let info = AddrInfo::from_parts(id.clone(), &["/ip4/127.0.0.1/tcp/9000", "/ip4/127.0.0.1/tcp/9001/p2p/abc"])
            .unwrap();
        assert_eq!(info.addrs.len(), 2);

        let mismatch = AddrInfo::from_parts(id.clone(), &["/ip4/127.0.0.1/tcp/9000/p2p/other"]);
        assert!(matches!(mismatch, Err(AddressError::PeerIdMismatch { .. })));
        assert_eq!(AddrInfo::from_parts::<&str>(id, &[]), Err(AddressError::Empty));
    }

    proptest! {
        #[test]
        fn prop_ip4_addresses_reparse(a: u8, b: u8, c: u8, d: u8, port: u16, ws: bool, id in "[a-zA-Z0-9]{1,52}") {
            let text = format!("/ip4/{a}.{b}.{c}.{d}/tcp/{port}{}/p2p/{id}", if ws { "/ws" } else { "" });
            let addr: PeerAddr = text.parse().unwrap();
            prop_assert_eq!(addr.to_string(), text);
            prop_assert_eq!(addr.dial_target().is_some(), !ws);
        }

        #[test]
        fn prop_parse_never_panics(input in "\\PC{0,64}") {
            let _ = input.parse::<PeerAddr>();
        }
    }
}
