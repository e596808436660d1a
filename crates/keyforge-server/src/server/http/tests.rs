use super::error::INVALID_BODY;
use super::handler::HealthBody;
use super::{AppState, router};
use crate::server::telemetry::TelemetryMetrics;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use core::time::Duration;
use keyforge::store::memory::MemoryStore;
use keyforge::store::sqlite::SqliteStore;
use keyforge::{CREATION_ACK, CreateAck, Orchestrator, RandomKeyGenerator, Status, StatusView};
use tower::ServiceExt;

const RECIPIENT: &str = "0x1234567890abcdef1234567890abcdef12345678";

fn memory_state(key_interval: Duration) -> AppState<MemoryStore> {
    Orchestrator::with_parts(MemoryStore::new(), RandomKeyGenerator, TelemetryMetrics)
        .with_key_interval(key_interval)
}

async fn send<S: keyforge::Store>(
    state: &AppState<S>,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_owned())
        }
        None => Body::empty(),
    };
    router(state.clone())
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn create_body(count: i64, recipient: &str) -> String {
    serde_json::json!({ "num_validators": count, "fee_recipient": recipient }).to_string()
}

async fn poll_terminal<S: keyforge::Store>(state: &AppState<S>, id: &str) -> StatusView {
    for _ in 0..1000 {
        let response = send(state, Method::GET, &format!("/validators/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let view: StatusView = serde_json::from_str(&body_text(response).await).unwrap();
        if view.status.is_terminal() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("request {id} did not finish");
}

#[tokio::test]
async fn create_then_poll_to_success() {
    let state = Orchestrator::with_parts(
        SqliteStore::in_memory().await.unwrap(),
        RandomKeyGenerator,
        TelemetryMetrics,
    );

    let response = send(
        &state,
        Method::POST,
        "/validators",
        Some(&create_body(3, RECIPIENT)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let ack: CreateAck = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(ack.message, CREATION_ACK);

    let view = poll_terminal(&state, &ack.request_id.to_string()).await;
    assert_eq!(view.status, Status::Successful);
    assert_eq!(view.keys.len(), 3);
    assert!(view.message.is_none());
}

#[tokio::test]
async fn started_request_serialises_status_only() {
    let state = memory_state(Duration::from_secs(60));

    let response = send(
        &state,
        Method::POST,
        "/validators",
        Some(&create_body(1, RECIPIENT)),
    )
    .await;
    let ack: CreateAck = serde_json::from_str(&body_text(response).await).unwrap();

    let response = send(
        &state,
        Method::GET,
        &format!("/validators/{}", ack.request_id),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "started" }));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let state = memory_state(Duration::ZERO);

    let bodies = [
        "{not json",
        r#"{"num_validators": 2}"#,
        r#"{"num_validators": "two", "fee_recipient": "0x"}"#,
    ];
    for body in bodies {
        let response = send(&state, Method::POST, "/validators", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(body_text(response).await, INVALID_BODY);
    }
    assert_eq!(state.store().request_count(), 0);
}

#[tokio::test]
async fn missing_content_type_is_a_bad_request() {
    let state = memory_state(Duration::ZERO);
    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/validators")
                .body(Body::from(create_body(1, RECIPIENT)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, INVALID_BODY);
}

#[tokio::test]
async fn invalid_input_reports_the_reason() {
    let state = memory_state(Duration::ZERO);

    let response = send(
        &state,
        Method::POST,
        "/validators",
        Some(&create_body(0, RECIPIENT)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "number of validators must be positive"
    );

    let response = send(
        &state,
        Method::POST,
        "/validators",
        Some(&create_body(2, "invalid-address")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_text(response).await,
        "invalid Ethereum address format"
    );

    assert_eq!(state.store().request_count(), 0);
}

#[tokio::test]
async fn store_outage_on_create_is_a_server_error() {
    let state = memory_state(Duration::ZERO);
    state.store().set_available(false);

    let response = send(
        &state,
        Method::POST,
        "/validators",
        Some(&create_body(1, RECIPIENT)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.in_flight(), 0);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let state = memory_state(Duration::ZERO);

    let unknown = keyforge::RequestId::new();
    for id in [unknown.to_string(), "not-a-uuid".to_string()] {
        let response = send(&state, Method::GET, &format!("/validators/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "id {id}");
    }
}

#[tokio::test]
async fn health_reflects_store_availability() {
    let state = memory_state(Duration::ZERO);

    let response = send(&state, Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: HealthBody = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body.status, "up");
    assert_eq!(body.database, "connected");

    state.store().set_available(false);
    let response = send(&state, Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: HealthBody = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body.status, "down");
    assert_eq!(body.database, "disconnected");
}

#[tokio::test]
async fn closed_sqlite_pool_is_unhealthy() {
    let state = Orchestrator::with_parts(
        SqliteStore::in_memory().await.unwrap(),
        RandomKeyGenerator,
        TelemetryMetrics,
    );
    state.store().close().await;

    let response = send(&state, Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unrouted_paths_are_not_found() {
    let state = memory_state(Duration::ZERO);
    let response = send(&state, Method::GET, "/nope", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&state, Method::DELETE, "/validators", None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
