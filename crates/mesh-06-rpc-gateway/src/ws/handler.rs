//! WebSocket connection handler.
//!
//! One reader loop per connection answers JSON-RPC calls in arrival order.
//! Responses and subscription notifications share a single outbound queue
//! drained by a writer task, so frames never interleave mid-message.

use crate::domain::error::ApiError;
use crate::domain::types::failure;
use crate::events::RpcLogEvent;
use crate::router::{handle_payload, AppState, Session};
use crate::ws::subscriptions::ConnectionId;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// WebSocket connection handler
pub struct WebSocketHandler {
    state: AppState,
    connection_id: ConnectionId,
    shutdown: watch::Receiver<bool>,
}

impl WebSocketHandler {
    pub fn new(state: AppState, shutdown: watch::Receiver<bool>) -> Self {
        let connection_id = state.subscriptions.next_connection_id();
        Self {
            state,
            connection_id,
            shutdown,
        }
    }

    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Handle a WebSocket connection until the client leaves or the server
    /// shuts down. All of the connection's subscriptions end with it.
    pub async fn handle(mut self, socket: WebSocket) {
        RpcLogEvent::ConnectionOpened {
            connection_id: self.connection_id,
        }
        .emit();

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut queue) = mpsc::channel::<Message>(self.state.config.subscriber_buffer);

        let connection_id = self.connection_id;
        let writer = tokio::spawn(async move {
            while let Some(message) = queue.recv().await {
                if let Err(e) = sink.send(message).await {
                    debug!(connection_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let session = Session {
            connection_id: self.connection_id,
            outbound: outbound.clone(),
        };

        loop {
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = self.shutdown.changed() => break,
            };
            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => {
                        let reply = failure(None, &ApiError::parse_error("binary frame is not UTF-8"));
                        if !send(&outbound, &reply).await {
                            break;
                        }
                        continue;
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    if outbound.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                    continue;
                }
                Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(connection_id, error = %e, "WebSocket receive failed");
                    break;
                }
            };

            let reply = match serde_json::from_str::<Value>(&text) {
                Ok(payload) => handle_payload(&self.state, payload, Some(&session)).await,
                Err(e) => failure(None, &ApiError::parse_error(e.to_string())),
            };
            if !send(&outbound, &reply).await {
                break;
            }
        }

        let subscriptions = self.state.subscriptions.remove_connection(self.connection_id);
        drop(session);
        drop(outbound);
        writer.abort();
        RpcLogEvent::ConnectionClosed {
            connection_id: self.connection_id,
            subscriptions,
        }
        .emit();
    }
}

async fn send(outbound: &mpsc::Sender<Message>, reply: &Value) -> bool {
    outbound.send(Message::Text(reply.to_string())).await.is_ok()
}
