//! JSON-RPC dispatch shared by the HTTP and WebSocket transports.

use crate::domain::config::RpcConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::domain::types::{failure, success, SubscriptionTopic};
use crate::events::RpcLogEvent;
use crate::ports::outbound::MeshRpcBackend;
use crate::ws::subscriptions::{ConnectionId, SubscriptionManager};
use axum::extract::ws::Message;
use mesh_telemetry::ORDERS_RECEIVED;
use serde::Serialize;
use serde_json::Value;
use shared_types::{decode_orders, PeerInfo, ValidationResponse};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn MeshRpcBackend>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub config: Arc<RpcConfig>,
}

/// The WebSocket connection a request arrived on. Subscriptions need one.
pub struct Session {
    pub connection_id: ConnectionId,
    pub outbound: mpsc::Sender<Message>,
}

/// Answer a parsed payload: a single call or a batch.
pub async fn handle_payload(state: &AppState, payload: Value, session: Option<&Session>) -> Value {
    match payload {
        Value::Array(batch) => {
            if batch.is_empty() {
                return failure(None, &ApiError::invalid_request("empty batch"));
            }
            if batch.len() > state.config.max_batch_size {
                return failure(
                    None,
                    &ApiError::limit_exceeded(format!(
                        "batch of {} exceeds {}",
                        batch.len(),
                        state.config.max_batch_size
                    )),
                );
            }
            let mut responses = Vec::with_capacity(batch.len());
            for request in &batch {
                responses.push(process_single_request(state, request, session).await);
            }
            Value::Array(responses)
        }
        single => process_single_request(state, &single, session).await,
    }
}

/// Process a single JSON-RPC request
async fn process_single_request(state: &AppState, request: &Value, session: Option<&Session>) -> Value {
    if !request.is_object() {
        return failure(None, &ApiError::invalid_request("request must be an object"));
    }
    let id = request.get("id").cloned();
    if let Some(ref id_val) = id {
        if !id_val.is_string() && !id_val.is_number() && !id_val.is_null() {
            return failure(None, &ApiError::invalid_request("id must be string, number or null"));
        }
    }
    if request.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return failure(id, &ApiError::invalid_request("jsonrpc must be \"2.0\""));
    }
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return failure(id, &ApiError::invalid_request("missing method"));
    };
    let params = request.get("params");

    let result = match method {
        "mesh_subscribe" | "mesh_unsubscribe" => match session {
            Some(session) => route_subscription(state, session, method, params),
            None => Err(ApiError::method_not_supported(method, "requires a WebSocket connection")),
        },
        _ => route_method(state, method, params).await,
    };

    match result {
        Ok(value) => success(id, value),
        Err(e) => {
            RpcLogEvent::RequestFailed {
                method: method.to_string(),
                code: e.code,
                message: e.message.clone(),
            }
            .emit();
            failure(id, &e)
        }
    }
}

/// Route request/response methods.
pub async fn route_method(state: &AppState, method: &str, params: Option<&Value>) -> ApiResult<Value> {
    match method {
        "mesh_addOrders" => {
            let raw: Vec<Value> = parse_param(params, 0)?;
            ORDERS_RECEIVED.with_label_values(&["rpc"]).inc_by(raw.len() as f64);
            let (orders, malformed) = decode_orders(raw);
            let mut response = if orders.is_empty() {
                ValidationResponse::default()
            } else {
                state.backend.add_orders(orders).await?
            };
            response.rejected.extend(malformed);
            to_json(&response)
        }
        "mesh_getOrders" => {
            let page: usize = parse_param(params, 0)?;
            let per_page: usize = parse_param(params, 1)?;
            let snapshot_id: String = parse_param_optional(params, 2).unwrap_or_default();
            to_json(&state.backend.get_orders(page, per_page, &snapshot_id).await?)
        }
        "mesh_addPeer" => {
            let peer: PeerInfo = parse_param(params, 0)?;
            state.backend.add_peer(peer).await?;
            Ok(Value::Null)
        }
        "mesh_getStats" => to_json(&state.backend.get_stats().await?),
        _ => Err(ApiError::method_not_found(method)),
    }
}

fn route_subscription(state: &AppState, session: &Session, method: &str, params: Option<&Value>) -> ApiResult<Value> {
    match method {
        "mesh_subscribe" => {
            let topic: SubscriptionTopic = parse_param(params, 0)?;
            let id = match topic {
                SubscriptionTopic::Orders => state.subscriptions.subscribe_orders(
                    session.connection_id,
                    state.backend.subscribe_orders(),
                    session.outbound.clone(),
                )?,
                SubscriptionTopic::Heartbeat => state
                    .subscriptions
                    .subscribe_heartbeat(session.connection_id, session.outbound.clone())?,
            };
            Ok(Value::String(id))
        }
        "mesh_unsubscribe" => {
            let id: String = parse_param(params, 0)?;
            Ok(Value::Bool(state.subscriptions.unsubscribe(session.connection_id, &id)))
        }
        _ => Err(ApiError::method_not_found(method)),
    }
}

fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

fn param_at(params: Option<&Value>, index: usize) -> Option<&Value> {
    params.and_then(|p| {
        if p.is_array() {
            p.get(index)
        } else if index == 0 {
            Some(p)
        } else {
            None
        }
    })
}

/// Parse a required parameter from JSON-RPC params array.
fn parse_param<T: serde::de::DeserializeOwned>(params: Option<&Value>, index: usize) -> ApiResult<T> {
    let param = param_at(params, index)
        .ok_or_else(|| ApiError::invalid_params(format!("missing parameter at index {index}")))?;
    serde_json::from_value(param.clone())
        .map_err(|e| ApiError::invalid_params(format!("parameter at index {index}: {e}")))
}

/// Parse an optional parameter; absent or `null` yields `None`.
fn parse_param_optional<T: serde::de::DeserializeOwned>(params: Option<&Value>, index: usize) -> Option<T> {
    param_at(params, index)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}
