//! HTTP surface of the service.
//!
//! | Route                          | Success | Errors          |
//! |--------------------------------|---------|-----------------|
//! | `POST /validators`             | `202`   | `400`, `500`    |
//! | `GET /validators/{request_id}` | `200`   | `404`, `500`    |
//! | `GET /health`                  | `200`   | `503`           |
//!
//! Success bodies are JSON, error bodies are plain text.

pub mod error;
pub mod handler;
pub mod middleware;
#[cfg(test)]
mod tests;

use crate::server::telemetry::TelemetryMetrics;
use axum::Router;
use axum::routing::{get, post};
use keyforge::{Orchestrator, RandomKeyGenerator, Store};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Router state: the orchestrator itself, which is cheap to clone.
pub type AppState<S> = Orchestrator<S, RandomKeyGenerator, TelemetryMetrics>;

pub fn router<S: Store>(orchestrator: AppState<S>) -> Router {
    Router::new()
        .route("/validators", post(handler::create_validators::<S>))
        .route(
            "/validators/{request_id}",
            get(handler::validator_status::<S>),
        )
        .route("/health", get(handler::health::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(axum::middleware::from_fn(middleware::track_requests)),
        )
        .with_state(orchestrator)
}
