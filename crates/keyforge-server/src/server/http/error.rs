use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyforge::Error;

/// Body returned for any request whose JSON could not be decoded.
pub const INVALID_BODY: &str = "Invalid request body";

/// HTTP-facing error. Bodies are plain text.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{INVALID_BODY}")]
    InvalidBody,

    #[error(transparent)]
    Core(#[from] Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::Core(err) => match err {
                Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                Error::NotFound { .. } => StatusCode::NOT_FOUND,
                Error::Store(_) | Error::EntropyUnavailable { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
