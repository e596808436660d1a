//! Persistent storage for requests and their generated keys.
//!
//! The [`Store`] is the only shared mutable state in the system. It must be
//! safe for concurrent use by many processing tasks and status readers at
//! once; serialising conflicting writes is the backend's job, the
//! orchestrator takes no locks of its own.
//!
//! The store does not enforce the "terminal status is written once" rule.
//! That holds by construction: only the single processing task launched for a
//! request ever calls [`Store::update_status`] on it.

pub mod memory;
pub mod sqlite;

use crate::{RequestId, Status, ValidatorKey, ValidatorRequest};
use core::future::Future;

/// Errors returned by [`Store`] implementations.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A record with this identifier already exists.
    #[error("duplicate id: {id}")]
    DuplicateId { id: String },

    /// No request exists with this identifier.
    #[error("request not found: {id}")]
    NotFound { id: String },

    /// A key referenced a request that does not exist.
    #[error("foreign key violation: request {request_id} does not exist")]
    ForeignKeyViolation { request_id: String },

    /// The underlying storage cannot be reached.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A persisted row could not be decoded into a domain value.
    #[error("corrupt record: {reason}")]
    Corrupt { reason: String },

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

/// Durable record of requests and generated keys.
pub trait Store: Send + Sync + 'static {
    /// Inserts `request` with status `started`.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateId`] if the identifier already exists.
    fn create_request(
        &self,
        request: &ValidatorRequest,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reads a request.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such request exists.
    fn get_request(
        &self,
        id: &RequestId,
    ) -> impl Future<Output = Result<ValidatorRequest, StoreError>> + Send;

    /// Overwrites status, error message and `updated_at`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such request exists.
    fn update_status(
        &self,
        id: &RequestId,
        status: Status,
        error_message: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persists one generated key.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignKeyViolation`] if the owning request is unknown.
    fn save_key(&self, key: &ValidatorKey) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the key values owned by a request in insertion order. Empty if
    /// there are none.
    fn list_keys(
        &self,
        request_id: &RequestId,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Checks that the storage is reachable.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if it is not.
    fn health_check(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
