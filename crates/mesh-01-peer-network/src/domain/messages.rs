//! # Wire Messages
//!
//! Every frame on a peer connection is a JSON-encoded [`WireMessage`]
//! preceded by its length as a 4-byte big-endian integer:
//!
//! ```text
//! ┌──────────────┬────────────────────────────┐
//! │ len: u32 BE  │ JSON WireMessage (len B)   │
//! └──────────────┴────────────────────────────┘
//! ```

use crate::events::NetworkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{decode_orders, PeerInfo, SignedOrder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Orders broadcast on the gossip topic.
///
/// Orders are decoded one at a time: entries that do not parse are counted
/// in `malformed` and left out, so one bad order does not cost the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOrderMessage")]
pub struct OrderMessage {
    pub orders: Vec<SignedOrder>,
    #[serde(skip_serializing)]
    pub malformed: usize,
}

impl OrderMessage {
    #[must_use]
    pub fn new(orders: Vec<SignedOrder>) -> Self {
        Self { orders, malformed: 0 }
    }
}

#[derive(Deserialize)]
struct RawOrderMessage {
    orders: Vec<Value>,
}

impl From<RawOrderMessage> for OrderMessage {
    fn from(raw: RawOrderMessage) -> Self {
        let (orders, rejected) = decode_orders(raw.orders);
        Self {
            orders,
            malformed: rejected.len(),
        }
    }
}

/// First frame each side sends on a new connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub peer_id: String,
    pub listen_addrs: Vec<String>,
    pub rendezvous: String,
    /// Chosen by the dialer to tell its connections apart; zero in replies.
    #[serde(default)]
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum WireMessage {
    Hello(Hello),
    Orders(OrderMessage),
    FindPeers { rendezvous: String },
    Peers { peers: Vec<PeerInfo> },
}

/// Orders received from a remote peer, as handed to the gossip loop.
#[derive(Debug, Clone)]
pub struct InboundOrders {
    pub from: crate::domain::identity::PeerId,
    pub orders: Vec<SignedOrder>,
}

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, message: &WireMessage, max_size: usize) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(message).map_err(|e| NetworkError::Codec(e.to_string()))?;
    if body.len() > max_size {
        return Err(NetworkError::MessageTooLarge {
            size: body.len(),
            max: max_size,
        });
    }
    let len = u32::try_from(body.len()).map_err(|_| NetworkError::MessageTooLarge {
        size: body.len(),
        max: max_size,
    })?;
    writer.write_u32(len).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame. `Ok(None)` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Option<WireMessage>, NetworkError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > max_size {
        return Err(NetworkError::MessageTooLarge { size: len, max: max_size });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| NetworkError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::testing::TestOrderBuilder;
    use shared_types::Address;

    #[tokio::test]
    async fn test_frames_over_a_duplex_stream() {
        let (mut a, mut b) = tokio::io::duplex(64 * 1024);
        let order = TestOrderBuilder::new(1337, Address([0x48; 20]), 1, Address([1; 20]), Address([2; 20])).build();
        let sent = [
            WireMessage::Hello(Hello {
                peer_id: "abc".into(),
                listen_addrs: vec!["/ip4/127.0.0.1/tcp/1".into()],
                rendezvous: "/0x-mesh/network/1337/version/1".into(),
                nonce: 7,
            }),
            WireMessage::Orders(OrderMessage::new(vec![order])),
        ];
        for message in &sent {
            write_frame(&mut a, message, 512 * 1024).await.unwrap();
        }
        drop(a);

        for message in &sent {
            assert_eq!(read_frame(&mut b, 512 * 1024).await.unwrap().as_ref(), Some(message));
        }
        assert_eq!(read_frame(&mut b, 512 * 1024).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_frames_are_refused() {
        let message = WireMessage::FindPeers {
            rendezvous: "x".repeat(2048),
        };
        let (mut a, mut b) = tokio::io::duplex(64 * 1024);
        assert!(matches!(
            write_frame(&mut a, &message, 1024).await,
            Err(NetworkError::MessageTooLarge { .. })
        ));

        write_frame(&mut a, &message, 4096).await.unwrap();
        assert!(matches!(
            read_frame(&mut b, 1024).await,
            Err(NetworkError::MessageTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_codec_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_u32(3).await.unwrap();
        a.write_all(b"{{{").await.unwrap();
        assert!(matches!(read_frame(&mut b, 1024).await, Err(NetworkError::Codec(_))));
    }

    #[tokio::test]
    async fn test_malformed_orders_are_dropped_from_the_batch() {
        let order = TestOrderBuilder::new(1337, Address([0x48; 20]), 1, Address([1; 20]), Address([2; 20])).build();
        let good = serde_json::to_value(&order).unwrap();
        let mut bad = good.clone();
        bad["makerAddress"] = serde_json::json!("0xzz");
        let body = serde_json::to_vec(&serde_json::json!({
            "type": "orders",
            "data": {"orders": [good, bad]},
        }))
        .unwrap();

        let (mut a, mut b) = tokio::io::duplex(64 * 1024);
        a.write_u32(body.len() as u32).await.unwrap();
        a.write_all(&body).await.unwrap();
        write_frame(&mut a, &WireMessage::FindPeers { rendezvous: "r".into() }, 64 * 1024)
            .await
            .unwrap();

        let Some(WireMessage::Orders(message)) = read_frame(&mut b, 64 * 1024).await.unwrap() else {
            panic!("expected orders");
        };
        assert_eq!(message.orders, vec![order]);
        assert_eq!(message.malformed, 1);
        // The stream is still usable after a batch with bad entries.
        assert!(matches!(
            read_frame(&mut b, 64 * 1024).await.unwrap(),
            Some(WireMessage::FindPeers { .. })
        ));
    }

    #[test]
    fn test_malformed_count_is_not_sent() {
        let json = serde_json::to_value(WireMessage::Orders(OrderMessage {
            orders: vec![],
            malformed: 3,
        }))
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "orders", "data": {"orders": []}}));
    }

    #[test]
    fn test_message_json_shape() {
        let json = serde_json::to_value(WireMessage::FindPeers {
            rendezvous: "r".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "findPeers", "data": {"rendezvous": "r"}}));
    }
}
