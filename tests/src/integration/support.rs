//! Node startup and client helpers shared by the integration flows.

use futures::{SinkExt, StreamExt};
use mesh_02_ethereum::{ContractAddresses, InMemoryLedger, GANACHE_CHAIN_ID};
use node_runtime::{NodeConfig, NodeRuntime};
use serde_json::{json, Value};
use shared_types::testing::TestOrderBuilder;
use shared_types::{Address, SignedOrder};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const WAIT: Duration = Duration::from_secs(10);
pub const MAKER_TOKEN: Address = Address([0xaa; 20]);
pub const TAKER_TOKEN: Address = Address([0xbb; 20]);

/// Loopback ports picked by the OS, no bootstrap, fast polling.
pub fn local_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
    config.network.use_bootstrap_list = false;
    config.network.bootstrap_grace = Duration::from_millis(100);
    config.network.connect_timeout = Duration::from_secs(2);
    config.network.discovery_interval = Duration::from_secs(1);
    config.rpc.listen_addr = "127.0.0.1:0".parse().unwrap();
    config.rpc.heartbeat_interval = Duration::from_millis(100);
    config.watcher.block_poll_interval = Duration::from_millis(50);
    config
}

/// A signed ganache order from the maker with key seed 1.
pub fn order(salt: u64) -> SignedOrder {
    TestOrderBuilder::new(
        GANACHE_CHAIN_ID,
        ContractAddresses::ganache().exchange,
        1,
        MAKER_TOKEN,
        TAKER_TOKEN,
    )
    .salt(salt)
    .build()
}

pub struct TestNode {
    pub runtime: NodeRuntime,
    pub ledger: Arc<InMemoryLedger>,
    http: reqwest::Client,
}

impl TestNode {
    pub async fn start(config: NodeConfig) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let runtime = NodeRuntime::start(config, ledger.clone())
            .await
            .expect("node failed to start");
        Self {
            runtime,
            ledger,
            http: reqwest::Client::new(),
        }
    }

    pub fn rpc_url(&self) -> String {
        format!("http://{}/", self.runtime.container().rpc_addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.runtime.container().rpc_addr)
    }

    /// The dialable address of this node, with its peer id.
    pub fn p2p_addr(&self) -> String {
        self.runtime.container().network.listen_addrs().remove(0)
    }

    pub fn peer_id(&self) -> String {
        use mesh_01_peer_network::PeerNetworkApi;
        self.runtime.container().network.identity().peer_id.to_string()
    }

    /// Fund `order`'s maker on this node's ledger.
    pub fn fund(&self, order: &SignedOrder) {
        self.ledger.fund(MAKER_TOKEN, order.maker_address);
    }

    /// One JSON-RPC call over HTTP. Returns the whole response object.
    pub async fn call(&self, method: &str, params: Value) -> Value {
        self.http
            .post(self.rpc_url())
            .json(&json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}))
            .send()
            .await
            .expect("RPC request failed")
            .json()
            .await
            .expect("RPC response was not JSON")
    }

    /// Call and unwrap `result`, failing the test on an error response.
    pub async fn result(&self, method: &str, params: Value) -> Value {
        let response = self.call(method, params).await;
        assert!(response.get("error").is_none(), "{method} failed: {response}");
        response["result"].clone()
    }

    pub async fn stop(self) {
        self.runtime.shutdown().await;
    }
}

/// JSON-RPC over WebSocket. Notifications that arrive while a call is
/// pending are kept for [`WsClient::notification`].
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: u64,
    pending: VecDeque<Value>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Self {
        let (stream, _) = connect_async(url).await.expect("WebSocket connect failed");
        Self {
            stream,
            next_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub async fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        self.stream
            .send(Message::Text(request.to_string().into()))
            .await
            .expect("WebSocket send failed");
        loop {
            let message = self.read().await;
            if message["id"] == json!(id) {
                return message;
            }
            self.pending.push_back(message);
        }
    }

    /// The next subscription notification.
    pub async fn notification(&mut self) -> Value {
        if let Some(message) = self.pending.pop_front() {
            return message;
        }
        self.read().await
    }

    async fn read(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(WAIT, self.stream.next())
                .await
                .expect("timed out waiting for a WebSocket message")
                .expect("WebSocket closed")
                .expect("WebSocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).expect("message was not JSON");
            }
        }
    }
}

/// Poll `check` until it holds or [`WAIT`] elapses.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check().await {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
