// src/routes/health.rs
//! Health check endpoint for the cold-chain monitor.
//!
//! This module defines the `/health` route used by container orchestrators
//! (e.g., Docker, Kubernetes) to verify that the service can still reach its
//! backing store. It is a sibling module in the `routes` directory:
//! - Internal to this file: endpoint handler and response type
//! - Exports to the gateway (`mod.rs`): a subrouter containing `/health`

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    backend: &'static str,
}

/// Handle `GET /health`.
///
/// Probes the store with a trivial query bounded by the store timeout.
/// Answers 503 when the store cannot be reached; the failure detail is
/// logged, not returned.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    let backend = state.config.backend_name();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "connected",
                backend,
            }),
        ),
        Err(e) => {
            tracing::error!("Health probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                    backend,
                }),
            )
        }
    }
}

/// Create a subrouter containing the `/health` route.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
