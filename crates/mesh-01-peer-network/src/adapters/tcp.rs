//! # TCP Peer Host
//!
//! One TCP connection per peer. Each connection runs a writer task fed by a
//! bounded channel and a reader task that dispatches incoming frames.
//!
//! ## Handshake
//!
//! ```text
//! dialer                                listener
//!   │──── Hello{id, addrs, rv, nonce} ───→│  rendezvous must match
//!   │←─── Hello{id, addrs, rv, 0} ────────│
//!   │  id must be the one dialed          │
//! ```
//!
//! When two connections to the same peer complete, for instance because both
//! sides dialed at once, each side keeps the one with the smaller
//! `(dialer id, nonce)` key. Both sides compute the same key for a connection,
//! so they settle on the same one and the other is closed.

use crate::domain::address::AddrInfo;
use crate::domain::config::NetworkConfig;
use crate::domain::identity::{NetworkIdentity, PeerId};
use crate::domain::messages::{read_frame, write_frame, Hello, InboundOrders, OrderMessage, WireMessage};
use crate::events::{NetworkError, NetworkLogEvent};
use crate::ports::outbound::PeerHost;
use async_trait::async_trait;
use mesh_telemetry::PEERS_CONNECTED;
use parking_lot::{Mutex, RwLock};
use shared_types::PeerInfo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Bound on an inbound handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames queued per peer before publishes to it are dropped.
const PEER_QUEUE: usize = 64;

/// Gossip batches queued for the gossip loop.
const INBOUND_BUFFER: usize = 256;

/// Identifies a connection the same way on both ends.
type ConnectionKey = (String, u64);

struct PeerConnection {
    conn_id: u64,
    key: ConnectionKey,
    info: PeerInfo,
    outbound: mpsc::Sender<WireMessage>,
    // Dropping this ends the connection's read loop.
    _close: oneshot::Sender<()>,
}

struct HostShared {
    identity: NetworkIdentity,
    rendezvous: String,
    local_addr: SocketAddr,
    max_message_size: usize,
    peers: RwLock<HashMap<PeerId, PeerConnection>>,
    pending_finds: Mutex<HashMap<PeerId, Vec<oneshot::Sender<Vec<PeerInfo>>>>>,
    next_conn: AtomicU64,
    inbound: mpsc::Sender<InboundOrders>,
    shutdown: watch::Receiver<bool>,
}

/// [`PeerHost`] over TCP.
pub struct TcpPeerHost {
    shared: Arc<HostShared>,
}

impl TcpPeerHost {
    /// Bind the listener and start accepting peers.
    ///
    /// Returns the host and the receiver of gossip batches from all peers.
    pub async fn bind(
        config: &NetworkConfig,
        identity: NetworkIdentity,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(Self, mpsc::Receiver<InboundOrders>), NetworkError> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let (inbound, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        let shared = Arc::new(HostShared {
            rendezvous: identity.rendezvous(),
            identity,
            local_addr,
            max_message_size: config.max_message_size,
            peers: RwLock::new(HashMap::new()),
            pending_finds: Mutex::new(HashMap::new()),
            next_conn: AtomicU64::new(1),
            inbound,
            shutdown,
        });
        tokio::spawn(accept_loop(Arc::clone(&shared), listener));

        debug!(addr = %local_addr, peer_id = %shared.identity.peer_id, "peer listener bound");
        Ok((Self { shared }, inbound_rx))
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }
}

async fn accept_loop(shared: Arc<HostShared>, listener: TcpListener) {
    let mut shutdown = shared.shutdown.clone();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        let result = timeout(HANDSHAKE_TIMEOUT, HostShared::accept_peer(&shared, stream))
                            .await
                            .unwrap_or(Err(NetworkError::Timeout));
                        if let Err(e) = result {
                            debug!(remote = %remote, error = %e, "inbound handshake failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept peer connection"),
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!("peer listener stopped");
}

fn format_listen_addr(addr: SocketAddr, peer_id: &PeerId) -> String {
    match addr {
        SocketAddr::V4(v4) => format!("/ip4/{}/tcp/{}/p2p/{peer_id}", v4.ip(), v4.port()),
        SocketAddr::V6(v6) => format!("/ip6/{}/tcp/{}/p2p/{peer_id}", v6.ip(), v6.port()),
    }
}

impl HostShared {
    fn hello(&self, nonce: u64) -> WireMessage {
        WireMessage::Hello(Hello {
            peer_id: self.identity.peer_id.to_string(),
            listen_addrs: vec![format_listen_addr(self.local_addr, &self.identity.peer_id)],
            rendezvous: self.rendezvous.clone(),
            nonce,
        })
    }

    async fn read_hello(&self, reader: &mut OwnedReadHalf) -> Result<Hello, NetworkError> {
        match read_frame(reader, self.max_message_size).await? {
            Some(WireMessage::Hello(hello)) => Ok(hello),
            Some(_) => Err(NetworkError::Handshake("expected hello".into())),
            None => Err(NetworkError::Handshake("connection closed during handshake".into())),
        }
    }

    fn check_hello(&self, hello: &Hello) -> Result<(), NetworkError> {
        if hello.rendezvous != self.rendezvous {
            return Err(NetworkError::Handshake(format!(
                "rendezvous mismatch: {}",
                hello.rendezvous
            )));
        }
        if hello.peer_id == self.identity.peer_id.as_str() {
            return Err(NetworkError::Handshake("connected to self".into()));
        }
        Ok(())
    }

    async fn accept_peer(this: &Arc<Self>, stream: TcpStream) -> Result<(), NetworkError> {
        let (mut reader, mut writer) = stream.into_split();
        let hello = this.read_hello(&mut reader).await?;
        // Reply before checking so a mismatched dialer sees our rendezvous.
        write_frame(&mut writer, &this.hello(0), this.max_message_size).await?;
        this.check_hello(&hello)?;
        let key = (hello.peer_id.clone(), hello.nonce);
        Self::register(this, hello, key, reader, writer, true);
        Ok(())
    }

    async fn dial(this: &Arc<Self>, info: &AddrInfo) -> Result<(), NetworkError> {
        let mut last_error = NetworkError::NoDialableAddress(info.peer_id.clone());
        let mut stream = None;
        for addr in &info.addrs {
            let Some(target) = addr.dial_target() else {
                continue;
            };
            match TcpStream::connect(target.as_str()).await {
                Ok(connected) => {
                    stream = Some(connected);
                    break;
                }
                Err(e) => last_error = e.into(),
            }
        }
        let stream = stream.ok_or(last_error)?;

        let nonce = rand::random::<u64>();
        let (mut reader, mut writer) = stream.into_split();
        write_frame(&mut writer, &this.hello(nonce), this.max_message_size).await?;
        let hello = this.read_hello(&mut reader).await?;
        this.check_hello(&hello)?;
        if hello.peer_id != info.peer_id.as_str() {
            return Err(NetworkError::Handshake(format!(
                "expected peer {}, got {}",
                info.peer_id, hello.peer_id
            )));
        }
        let key = (this.identity.peer_id.to_string(), nonce);
        if Self::register(this, hello, key, reader, writer, false) || this.peers.read().contains_key(&info.peer_id) {
            Ok(())
        } else {
            Err(NetworkError::Handshake("duplicate connection closed".into()))
        }
    }

    /// Install a handshaken connection unless one with a smaller key is
    /// already in place. Returns whether the new connection was kept.
    fn register(
        this: &Arc<Self>,
        hello: Hello,
        key: ConnectionKey,
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        inbound: bool,
    ) -> bool {
        let peer_id = PeerId::from(hello.peer_id.clone());
        let conn_id = this.next_conn.fetch_add(1, Ordering::Relaxed);
        let (outbound, outbound_rx) = mpsc::channel(PEER_QUEUE);
        let (close, closed) = oneshot::channel();
        let replaced = {
            let mut peers = this.peers.write();
            let replaced = match peers.get(&peer_id) {
                Some(existing) if existing.key <= key => {
                    debug!(peer_id = %peer_id, "duplicate connection dropped");
                    return false;
                }
                Some(_) => true,
                None => false,
            };
            // Replacing drops the old connection's close handle.
            peers.insert(
                peer_id.clone(),
                PeerConnection {
                    conn_id,
                    key,
                    info: PeerInfo {
                        id: hello.peer_id,
                        addrs: hello.listen_addrs,
                    },
                    outbound,
                    _close: close,
                },
            );
            PEERS_CONNECTED.set(peers.len() as f64);
            replaced
        };
        if replaced {
            debug!(peer_id = %peer_id, "duplicate connection replaced");
        } else {
            NetworkLogEvent::PeerConnected {
                peer_id: peer_id.clone(),
                inbound,
            }
            .emit();
        }

        tokio::spawn(write_loop(writer, outbound_rx, this.max_message_size));
        tokio::spawn(read_loop(Arc::clone(this), peer_id, conn_id, reader, closed));
        true
    }

    fn disconnect(&self, peer_id: &PeerId, conn_id: u64) {
        let removed = {
            let mut peers = self.peers.write();
            let current = peers.get(peer_id).map(|conn| conn.conn_id);
            let removed = current == Some(conn_id) && peers.remove(peer_id).is_some();
            PEERS_CONNECTED.set(peers.len() as f64);
            removed
        };
        if removed {
            self.pending_finds.lock().remove(peer_id);
            NetworkLogEvent::PeerDisconnected {
                peer_id: peer_id.clone(),
            }
            .emit();
        }
    }

    fn connected_peers_except(&self, exclude: &PeerId) -> Vec<PeerInfo> {
        self.peers
            .read()
            .iter()
            .filter(|(id, _)| *id != exclude)
            .map(|(_, conn)| conn.info.clone())
            .collect()
    }

    async fn dispatch(&self, from: &PeerId, message: WireMessage) {
        match message {
            WireMessage::Orders(OrderMessage { orders, malformed }) => {
                if malformed > 0 {
                    NetworkLogEvent::MalformedOrders {
                        from: from.clone(),
                        count: malformed,
                    }
                    .emit();
                }
                if orders.is_empty() {
                    return;
                }
                let batch = InboundOrders {
                    from: from.clone(),
                    orders,
                };
                if self.inbound.send(batch).await.is_err() {
                    debug!("gossip receiver closed; dropping orders");
                }
            }
            WireMessage::FindPeers { rendezvous } => {
                if rendezvous != self.rendezvous {
                    return;
                }
                let reply = WireMessage::Peers {
                    peers: self.connected_peers_except(from),
                };
                let sender = self.peers.read().get(from).map(|conn| conn.outbound.clone());
                if let Some(sender) = sender {
                    let _ = sender.try_send(reply);
                }
            }
            WireMessage::Peers { peers } => {
                let waiters = self.pending_finds.lock().remove(from).unwrap_or_default();
                for waiter in waiters {
                    let _ = waiter.send(peers.clone());
                }
            }
            WireMessage::Hello(_) => debug!(peer_id = %from, "unexpected hello after handshake"),
        }
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<WireMessage>, max_size: usize) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &message, max_size).await {
            debug!(error = %e, "peer write failed");
            break;
        }
    }
}

async fn read_loop(
    shared: Arc<HostShared>,
    peer_id: PeerId,
    conn_id: u64,
    mut reader: OwnedReadHalf,
    mut closed: oneshot::Receiver<()>,
) {
    let mut shutdown = shared.shutdown.clone();
    loop {
        tokio::select! {
            frame = read_frame(&mut reader, shared.max_message_size) => match frame {
                Ok(Some(message)) => shared.dispatch(&peer_id, message).await,
                Ok(None) => break,
                Err(e) => {
                    debug!(peer_id = %peer_id, error = %e, "peer read failed");
                    break;
                }
            },
            _ = &mut closed => break,
            _ = shutdown.changed() => break,
        }
    }
    shared.disconnect(&peer_id, conn_id);
}

#[async_trait]
impl PeerHost for TcpPeerHost {
    fn local_peer_id(&self) -> PeerId {
        self.shared.identity.peer_id.clone()
    }

    fn listen_addrs(&self) -> Vec<String> {
        vec![format_listen_addr(self.shared.local_addr, &self.shared.identity.peer_id)]
    }

    async fn connect(&self, info: &AddrInfo) -> Result<(), NetworkError> {
        if info.peer_id == self.shared.identity.peer_id {
            return Err(NetworkError::Handshake("refusing to dial self".into()));
        }
        if self.is_connected(&info.peer_id) {
            return Ok(());
        }
        HostShared::dial(&self.shared, info).await
    }

    fn is_connected(&self, peer: &PeerId) -> bool {
        self.shared.peers.read().contains_key(peer)
    }

    fn connected_peers(&self) -> Vec<PeerInfo> {
        self.shared.peers.read().values().map(|conn| conn.info.clone()).collect()
    }

    async fn publish(&self, message: OrderMessage, exclude: Option<&PeerId>) -> Result<usize, NetworkError> {
        let targets: Vec<(PeerId, mpsc::Sender<WireMessage>)> = self
            .shared
            .peers
            .read()
            .iter()
            .filter(|(id, _)| exclude.map_or(true, |excluded| *id != excluded))
            .map(|(id, conn)| (id.clone(), conn.outbound.clone()))
            .collect();

        let frame = WireMessage::Orders(message);
        let mut queued = 0;
        for (peer_id, sender) in targets {
            match sender.try_send(frame.clone()) {
                Ok(()) => queued += 1,
                Err(e) => debug!(peer_id = %peer_id, error = %e, "publish to peer skipped"),
            }
        }
        Ok(queued)
    }

    async fn find_peers(&self, peer: &PeerId) -> Result<Vec<PeerInfo>, NetworkError> {
        let sender = self
            .shared
            .peers
            .read()
            .get(peer)
            .map(|conn| conn.outbound.clone())
            .ok_or_else(|| NetworkError::NotConnected(peer.clone()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.shared
            .pending_finds
            .lock()
            .entry(peer.clone())
            .or_default()
            .push(reply_tx);
        sender
            .send(WireMessage::FindPeers {
                rendezvous: self.shared.rendezvous.clone(),
            })
            .await
            .map_err(|_| NetworkError::NotConnected(peer.clone()))?;
        reply_rx.await.map_err(|_| NetworkError::NotConnected(peer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::testing::TestOrderBuilder;
    use shared_types::Address;

    struct TestHost {
        host: TcpPeerHost,
        inbound: mpsc::Receiver<InboundOrders>,
        _shutdown: watch::Sender<bool>,
    }

    async fn spawn_host(chain_id: u64) -> TestHost {
        let config = NetworkConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..NetworkConfig::default()
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let identity = NetworkIdentity::new(PeerId::random(), chain_id);
        let (host, inbound) = TcpPeerHost::bind(&config, identity, shutdown_rx).await.unwrap();
        TestHost {
            host,
            inbound,
            _shutdown: shutdown_tx,
        }
    }

    fn addr_info(target: &TestHost) -> AddrInfo {
        AddrInfo::from_parts(target.host.local_peer_id(), &target.host.listen_addrs()).unwrap()
    }

    async fn wait_for_peers(host: &TcpPeerHost, count: usize) {
        timeout(Duration::from_secs(2), async {
            while host.connected_peers().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timeout");
    }

    #[tokio::test]
    async fn test_connect_registers_both_sides() {
        let a = spawn_host(1337).await;
        let b = spawn_host(1337).await;

        a.host.connect(&addr_info(&b)).await.unwrap();
        assert!(a.host.is_connected(&b.host.local_peer_id()));
        wait_for_peers(&b.host, 1).await;
        assert!(b.host.is_connected(&a.host.local_peer_id()));

        // Already connected: no second dial.
        a.host.connect(&addr_info(&b)).await.unwrap();
        assert_eq!(a.host.connected_peers().len(), 1);
    }

    fn connection_key(host: &TcpPeerHost, peer: &PeerId) -> Option<ConnectionKey> {
        host.shared.peers.read().get(peer).map(|conn| conn.key.clone())
    }

    #[tokio::test]
    async fn test_simultaneous_dials_settle_on_one_connection() {
        for _ in 0..20 {
            let a = spawn_host(1337).await;
            let mut b = spawn_host(1337).await;
            let (b_info, a_info) = (addr_info(&b), addr_info(&a));
            let (from_a, from_b) = tokio::join!(a.host.connect(&b_info), b.host.connect(&a_info));
            from_a.unwrap();
            from_b.unwrap();

            let (a_id, b_id) = (a.host.local_peer_id(), b.host.local_peer_id());
            timeout(Duration::from_secs(2), async {
                loop {
                    let on_a = connection_key(&a.host, &b_id);
                    if on_a.is_some() && on_a == connection_key(&b.host, &a_id) {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("connections did not settle");
            assert_eq!(a.host.connected_peers().len(), 1);
            assert_eq!(b.host.connected_peers().len(), 1);

            let order =
                TestOrderBuilder::new(1337, Address([0x48; 20]), 1, Address([1; 20]), Address([2; 20])).build();
            assert_eq!(a.host.publish(OrderMessage::new(vec![order.clone()]), None).await.unwrap(), 1);
            let received = timeout(Duration::from_secs(2), b.inbound.recv())
                .await
                .expect("timeout")
                .unwrap();
            assert_eq!(received.orders, vec![order]);
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_peer() {
        let a = spawn_host(1337).await;
        let mut b = spawn_host(1337).await;
        a.host.connect(&addr_info(&b)).await.unwrap();

        let order = TestOrderBuilder::new(1337, Address([0x48; 20]), 1, Address([1; 20]), Address([2; 20])).build();
        let sent = a
            .host
            .publish(OrderMessage::new(vec![order.clone()]), None)
            .await
            .unwrap();
        assert_eq!(sent, 1);

        let received = timeout(Duration::from_secs(2), b.inbound.recv())
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(received.from, a.host.local_peer_id());
        assert_eq!(received.orders, vec![order]);
    }

    #[tokio::test]
    async fn test_publish_excludes_sender() {
        let a = spawn_host(1337).await;
        let b = spawn_host(1337).await;
        a.host.connect(&addr_info(&b)).await.unwrap();

        let excluded = b.host.local_peer_id();
        let sent = a
            .host
            .publish(OrderMessage::new(vec![]), Some(&excluded))
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_find_peers_returns_other_connections() {
        let hub = spawn_host(1337).await;
        let a = spawn_host(1337).await;
        let c = spawn_host(1337).await;
        a.host.connect(&addr_info(&hub)).await.unwrap();
        c.host.connect(&addr_info(&hub)).await.unwrap();
        wait_for_peers(&hub.host, 2).await;

        let found = timeout(Duration::from_secs(2), a.host.find_peers(&hub.host.local_peer_id()))
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, c.host.local_peer_id().to_string());
        assert_eq!(found[0].addrs, c.host.listen_addrs());
    }

    #[tokio::test]
    async fn test_rendezvous_mismatch_is_refused() {
        let a = spawn_host(1337).await;
        let other_chain = spawn_host(1).await;
        let result = a.host.connect(&addr_info(&other_chain)).await;
        assert!(matches!(result, Err(NetworkError::Handshake(_))));
        assert!(a.host.connected_peers().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_peer_id_is_refused() {
        let a = spawn_host(1337).await;
        let b = spawn_host(1337).await;
        let mut info = addr_info(&b);
        info.peer_id = PeerId::from("someone-else");
        assert!(matches!(a.host.connect(&info).await, Err(NetworkError::Handshake(_))));
    }

    #[tokio::test]
    async fn test_websocket_only_peer_is_not_dialable() {
        let a = spawn_host(1337).await;
        let info = AddrInfo::from_parts(PeerId::from("ws-peer"), &["/ip4/127.0.0.1/tcp/1/ws"]).unwrap();
        assert_eq!(
            a.host.connect(&info).await,
            Err(NetworkError::NoDialableAddress(PeerId::from("ws-peer")))
        );
    }

    #[tokio::test]
    async fn test_disconnect_is_observed() {
        let a = spawn_host(1337).await;
        let b = spawn_host(1337).await;
        a.host.connect(&addr_info(&b)).await.unwrap();
        wait_for_peers(&b.host, 1).await;

        drop(a);
        timeout(Duration::from_secs(2), async {
            while !b.host.connected_peers().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timeout");
    }
}
