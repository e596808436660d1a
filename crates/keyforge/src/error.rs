//! Error types for validator key provisioning.
//!
//! [`Error`] is what callers of the [`Orchestrator`](crate::Orchestrator) see.
//! Failures inside a background processing task never surface here; they are
//! recorded on the request as a `failed` status instead.
//!
//! ## Error Cases
//! - `InvalidInput`: the request was rejected before anything was persisted.
//! - `NotFound`: no request exists for the given identifier.
//! - `Store`: the persistent store failed.
//! - `EntropyUnavailable`: the randomness source could not produce key
//!   material.

use crate::store::StoreError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the provisioning core.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bad validator count or malformed fee recipient.
    #[error("{reason}")]
    InvalidInput { reason: String },

    /// Unknown (or unparseable) request identifier.
    #[error("request not found: {request_id}")]
    NotFound { request_id: String },

    /// Any store operation failed.
    #[error("store error: {0}")]
    Store(StoreError),

    /// The OS randomness source failed.
    #[error("entropy unavailable: {reason}")]
    EntropyUnavailable { reason: String },
}

impl Error {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { request_id: id },
            other => Self::Store(other),
        }
    }
}
