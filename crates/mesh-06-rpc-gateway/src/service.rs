//! # RPC Server
//!
//! Binds the HTTP listener and serves the gateway routes:
//!
//! ```text
//!   POST /         JSON-RPC request/response (single or batch)
//!   GET  /ws       JSON-RPC over WebSocket, plus subscriptions
//!   GET  /health   liveness
//!   GET  /metrics  Prometheus text exposition
//! ```
//!
//! Every route sits behind request tracing, CORS and a request timeout.
//! Request bodies are capped by axum's `DefaultBodyLimit`, which answers 413.
//! Shutdown is driven by the node's `watch` channel: the listener
//! stops accepting, open WebSocket connections end and every subscription is
//! cancelled.

use crate::domain::config::RpcConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::domain::types::failure;
use crate::events::RpcLogEvent;
use crate::middleware::create_cors_layer;
use crate::ports::outbound::MeshRpcBackend;
use crate::router::{handle_payload, AppState};
use crate::ws::{SubscriptionManager, WebSocketHandler};
use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct RpcServer {
    state: AppState,
    shutdown: watch::Receiver<bool>,
}

impl RpcServer {
    pub fn new(
        config: RpcConfig,
        backend: Arc<dyn MeshRpcBackend>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let subscriptions = Arc::new(SubscriptionManager::new(
            config.max_subscriptions_per_connection,
            config.heartbeat_interval,
        ));
        Ok(Self {
            state: AppState {
                backend,
                subscriptions,
                config: Arc::new(config),
            },
            shutdown,
        })
    }

    #[must_use]
    pub fn subscriptions(&self) -> Arc<SubscriptionManager> {
        Arc::clone(&self.state.subscriptions)
    }

    /// Build the router with all middleware applied.
    pub fn router(&self) -> Router {
        let config = &self.state.config;
        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&config.cors))
            .layer(TimeoutLayer::new(config.request_timeout));

        Router::new()
            .route("/", post(handle_json_rpc))
            .route("/ws", get(handle_ws_upgrade))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .layer(Extension(self.shutdown.clone()))
            .layer(DefaultBodyLimit::max(config.max_request_size))
            .layer(middleware)
            .with_state(self.state.clone())
    }

    pub async fn bind(&self) -> Result<TcpListener, GatewayError> {
        TcpListener::bind(self.state.config.listen_addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {e}", self.state.config.listen_addr)))
    }

    /// Serve until the shutdown signal fires.
    pub async fn serve(self, listener: TcpListener) -> Result<(), GatewayError> {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        let router = self.router();
        let mut shutdown = self.shutdown.clone();

        RpcLogEvent::Started { addr: addr.to_string() }.emit();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await;

        self.state.subscriptions.close_all();
        RpcLogEvent::Stopped.emit();
        result.map_err(|e| GatewayError::Serve(e.to_string()))
    }
}

/// Handle JSON-RPC request over HTTP
async fn handle_json_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => Json(handle_payload(&state, payload, None).await).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(failure(None, &ApiError::parse_error(e.to_string()))),
        )
            .into_response(),
    }
}

async fn handle_ws_upgrade(
    State(state): State<AppState>,
    Extension(shutdown): Extension<watch::Receiver<bool>>,
    ws: WebSocketUpgrade,
) -> Response {
    let max = state.config.max_request_size;
    ws.max_message_size(max)
        .on_upgrade(move |socket| WebSocketHandler::new(state, shutdown).handle(socket))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics() -> Response {
    match mesh_telemetry::gather_text() {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
