use super::AppState;
use super::error::ApiError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use keyforge::{CreateAck, StatusView, Store};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateValidatorsBody {
    pub num_validators: i64,
    pub fee_recipient: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthBody {
    pub status: String,
    pub database: String,
}

/// `POST /validators`
pub async fn create_validators<S: Store>(
    State(orchestrator): State<AppState<S>>,
    body: Result<Json<CreateValidatorsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateAck>), ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError::InvalidBody
    })?;

    let ack = orchestrator
        .create_validator_request(body.num_validators, &body.fee_recipient)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// `GET /validators/{request_id}`
pub async fn validator_status<S: Store>(
    State(orchestrator): State<AppState<S>>,
    Path(request_id): Path<String>,
) -> Result<Json<StatusView>, ApiError> {
    let view = orchestrator.get_request_status(&request_id).await?;
    Ok(Json(view))
}

/// `GET /health`
pub async fn health<S: Store>(
    State(orchestrator): State<AppState<S>>,
) -> (StatusCode, Json<HealthBody>) {
    match orchestrator.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthBody {
                status: "up".to_string(),
                database: "connected".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthBody {
                    status: "down".to_string(),
                    database: "disconnected".to_string(),
                }),
            )
        }
    }
}
