//! HTTP service front end for Quarry.
//!
//! Exposes one RPC-style call, `handle_search(query) -> string`, plus a
//! liveness probe. Each request runs as an isolated task; failures come
//! back as strings starting with `Error:` rather than HTTP errors.
//!
//! Built on Axum.

use async_trait::async_trait;
use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use quarry_agent::{Runtime, TaskRunner};
use quarry_config::AppConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// The operation the service exposes.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run `query` to completion. Never fails; errors are `Error: ...` text.
    async fn handle_search(&self, query: &str) -> String;
}

#[async_trait]
impl SearchService for TaskRunner {
    async fn handle_search(&self, query: &str) -> String {
        self.handle(query).await
    }
}

/// Shared application state for the gateway.
pub struct GatewayState {
    pub service: Arc<dyn SearchService>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rpc", post(rpc_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let runtime = Runtime::from_config(&config)?;
    let state = Arc::new(GatewayState {
        service: runtime.runner.clone(),
    });
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Gateway shutting down");
        })
        .await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: serde_json::Value,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct RpcResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
}

impl RpcResponse {
    fn result(result: String, id: Option<serde_json::Value>) -> Self {
        Self { result: Some(result), error: None, id }
    }

    fn error(error: String, id: Option<serde_json::Value>) -> Self {
        Self { result: None, error: Some(error), id }
    }
}

async fn rpc_handler(
    State(state): State<SharedState>,
    Json(request): Json<RpcRequest>,
) -> (StatusCode, Json<RpcResponse>) {
    if request.method != "handle_search" {
        warn!(method = %request.method, "Unknown RPC method");
        return (
            StatusCode::BAD_REQUEST,
            Json(RpcResponse::error(format!("Unknown method: {}", request.method), request.id)),
        );
    }

    let Some(query) = request.params.get("query").and_then(|q| q.as_str()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RpcResponse::error("Missing string parameter 'query'".into(), request.id)),
        );
    };

    info!(query_len = query.len(), "handle_search received");
    let result = state.service.handle_search(query).await;
    if result.starts_with("Error:") {
        warn!(result = %result, "handle_search failed");
    }
    (StatusCode::OK, Json(RpcResponse::result(result, request.id)))
}
