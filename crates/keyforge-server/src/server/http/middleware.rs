use crate::server::telemetry::record_http_request;
use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

/// Label used for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Logs each request and records per-route metrics.
///
/// Routes are labelled by their template (`/validators/{request_id}`), never
/// by the raw path, so request ids do not explode metric cardinality.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_owned(), |m| m.as_str().to_owned());

    tracing::info!(%method, %path, "request started");

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    tracing::info!(
        %method,
        %path,
        status,
        duration_ms = elapsed.as_millis() as u64,
        "request completed"
    );
    record_http_request(
        &route,
        method.as_str(),
        status,
        elapsed.as_secs_f64() * 1_000.0,
    );

    response
}
