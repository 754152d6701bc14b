//! Routes gateway.
//!
//! Each sibling module exports a subrouter for one resource; this gateway
//! merges them, installs the shared layers and binds the application state,
//! so `main.rs` never needs to know about individual endpoints.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Query, Request},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::error::{ApiError, ErrorReport};
use crate::store::Store;
use crate::Config;

mod dashboard;
mod health;
mod index;
mod readings;
mod sensors;
mod vehicles;

// ---

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(index::router())
        .merge(health::router())
        .merge(sensors::router())
        .merge(readings::router())
        .merge(vehicles::router())
        .merge(dashboard::router())
        .fallback(unknown_route)
        .layer(middleware::from_fn(error_envelope))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `Query` extractor that rejects with [`ApiError::InvalidQuery`].
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

async fn unknown_route() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Complete error envelopes with the request path and method, and log every
/// response with an error status.
async fn error_envelope(request: Request, next: Next) -> Response {
    // ---
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        warn!("Response error: {} {} - {}", method, path, status.as_u16());
    }

    match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (status, Json(report.envelope(&path, method.as_str()))).into_response(),
        None => response,
    }
}
