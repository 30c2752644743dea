//! Cirkl HTTP API
//!
//! Axum server fronting the in-memory connection store. CORS is wide open so
//! browser-hosted workflow tools can call it directly.
//!
//! Each endpoint has a thin axum handler that delegates to a plain inner
//! function, so the logic is testable without going through the router.
//!
//! Endpoints:
//! - POST /api/connection/add: append a connection for a user
//! - GET  /health: liveness

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use cirkl_core::{CirklConfig, ConnectionRequest, MemoryStore};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub store: MemoryStore,
    pub config: CirklConfig,
}

impl HttpState {
    pub fn new(config: CirklConfig) -> Self {
        Self {
            store: MemoryStore::new(),
            config,
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/api/connection/add", post(add_connection_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Bind the configured address and serve until the shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = state.config.http.bind_addr();
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Cirkl HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AddConnectionResponse {
    pub status: &'static str,
    pub message: String,
    pub connection_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub timestamp: String,
}

/// Error body, `{"detail": ...}` for both validation and internal failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Append the connection and build the success payload.
pub fn add_connection_inner(
    store: &MemoryStore,
    req: ConnectionRequest,
) -> (StatusCode, serde_json::Value) {
    let connection_name = req.connection_name.clone();

    match store.add_connection(req) {
        Ok(record) => {
            tracing::info!(
                user_id = %record.user_id,
                connection_id = %record.id,
                "Connection added"
            );
            let body = AddConnectionResponse {
                status: "success",
                message: format!("Connexion avec {} ajoutée", connection_name),
                connection_id: record.id,
            };
            (StatusCode::OK, to_json(&body))
        }
        Err(e) => {
            tracing::error!("Failed to add connection: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                to_json(&ErrorResponse::new(e.to_string())),
            )
        }
    }
}

/// Decode the add-connection body. A missing `Content-Type` is read as JSON;
/// any other non-JSON media type, malformed JSON or a schema mismatch yields
/// 422 with `{detail}`.
pub fn parse_connection_body(
    headers: &HeaderMap,
    body: &[u8],
) -> std::result::Result<ConnectionRequest, (StatusCode, serde_json::Value)> {
    if let Some(value) = headers.get(header::CONTENT_TYPE) {
        let content_type = value.to_str().unwrap_or_default();
        if !is_json_content_type(content_type) {
            let detail = format!("Expected a JSON body, got Content-Type {:?}", content_type);
            tracing::debug!("Rejected request body: {}", detail);
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                to_json(&ErrorResponse::new(detail)),
            ));
        }
    }

    serde_json::from_slice(body).map_err(|e| {
        let detail = format!("Failed to deserialize the JSON body: {}", e);
        tracing::debug!("Rejected request body: {}", detail);
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            to_json(&ErrorResponse::new(detail)),
        )
    })
}

/// Body could not be read at all (too large, connection dropped).
pub fn bytes_rejection_inner(rejection: &BytesRejection) -> (StatusCode, serde_json::Value) {
    let status = rejection.status();
    tracing::debug!(%status, "Failed to read request body: {}", rejection.body_text());
    (status, to_json(&ErrorResponse::new(rejection.body_text())))
}

/// Health payload (pure, no IO).
pub fn health_inner(service: &str) -> serde_json::Value {
    to_json(&HealthResponse {
        status: "healthy",
        service: service.to_string(),
        timestamp: cirkl_core::models::connection::now_iso8601(),
    })
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn add_connection_handler(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    payload: std::result::Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(bytes) => match parse_connection_body(&headers, &bytes) {
            Ok(req) => add_connection_inner(&state.store, req),
            Err(rejected) => rejected,
        },
        Err(rejection) => bytes_rejection_inner(&rejection),
    };
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(health_inner(&state.config.service.name)))
}

// ============================================================================
// Helpers
// ============================================================================

/// `application/json` or any `+json` structured suffix, parameters ignored.
fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| serde_json::json!({ "detail": e.to_string() }))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
