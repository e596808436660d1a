//! Request lifecycle orchestration.
//!
//! This module defines [`Orchestrator`], which owns the lifecycle of a
//! validator key request:
//!
//! ```text
//! create ──► store(started) ──► spawn task ──► return id
//!                                   │
//!                                   ├─► generate ─► save_key   (× N)
//!                                   └─► store(successful | failed)
//!
//! poll ──► store snapshot (never waits on the task)
//! ```
//!
//! ## Responsibilities
//!
//! - Validate input and persist the `started` record before answering.
//! - Launch exactly one detached processing task per accepted request. The
//!   creation call never awaits, blocks on, or cancels that task.
//! - Serve status reads straight from the [`Store`].
//!
//! ## Limitations
//!
//! No admission control bounds how many tasks run at once, and tasks are never
//! cancelled or timed out. A task that is still running when the process
//! exits, or whose terminal status write fails, leaves its request `started`
//! permanently. Nothing sweeps such requests.

mod task;

use crate::{
    CreateAck, Error, FeeRecipient, KeyGenerator, Metrics, NoopMetrics, RandomKeyGenerator,
    RequestId, Result, Status, StatusView, Store, ValidatorRequest,
};
use core::time::Duration;
use std::sync::Arc;
use task::ProcessingTask;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

pub use task::{KEYGEN_FAILED, PERSIST_FAILED};

/// Acknowledgement returned for every accepted request.
pub const CREATION_ACK: &str = "Validator creation in progress";

/// Collaborators shared by the orchestrator and all of its processing tasks.
pub(crate) struct Shared<S, K, M> {
    pub(crate) store: S,
    pub(crate) keygen: K,
    pub(crate) metrics: M,
}

/// Accepts validator key requests and serves their status.
///
/// Cloning is cheap; clones share the same store, generator, metrics sink and
/// in-flight task set.
///
/// Processing tasks are spawned on the ambient tokio runtime, so
/// [`create_validator_request`](Self::create_validator_request) must be called
/// from within one.
pub struct Orchestrator<S, K = RandomKeyGenerator, M = NoopMetrics> {
    shared: Arc<Shared<S, K, M>>,
    tracker: TaskTracker,
    key_interval: Duration,
}

impl<S, K, M> Clone for Orchestrator<S, K, M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            tracker: self.tracker.clone(),
            key_interval: self.key_interval,
        }
    }
}

impl<S: Store> Orchestrator<S, RandomKeyGenerator, NoopMetrics> {
    /// Creates an orchestrator with the OS-random key generator and no
    /// metrics.
    pub fn new(store: S) -> Self {
        Self::with_parts(store, RandomKeyGenerator, NoopMetrics)
    }
}

impl<S, K, M> Orchestrator<S, K, M>
where
    S: Store,
    K: KeyGenerator,
    M: Metrics,
{
    pub fn with_parts(store: S, keygen: K, metrics: M) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                keygen,
                metrics,
            }),
            tracker: TaskTracker::new(),
            key_interval: Duration::ZERO,
        }
    }

    /// Pauses each processing task for `interval` before every key. Zero (the
    /// default) disables pacing.
    #[must_use]
    pub fn with_key_interval(mut self, interval: Duration) -> Self {
        self.key_interval = interval;
        self
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Validates and records a new request, then launches its processing
    /// task.
    ///
    /// Returns as soon as the `started` record is durable, regardless of how
    /// far the task has progressed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `requested_count <= 0` or `fee_recipient`
    ///   is not `0x` + 40 hex digits. Nothing is persisted.
    /// - [`Error::Store`] if the initial write fails. No task is launched and
    ///   the write is not retried.
    #[tracing::instrument(skip(self), fields(request_id))]
    pub async fn create_validator_request(
        &self,
        requested_count: i64,
        fee_recipient: &str,
    ) -> Result<CreateAck> {
        let (count, fee_recipient) = match validate(requested_count, fee_recipient) {
            Ok(input) => input,
            Err(e) => {
                tracing::debug!(error = %e, "rejected validator request");
                self.shared.metrics.request_rejected();
                return Err(e);
            }
        };

        let request = ValidatorRequest::new(count, fee_recipient);
        tracing::Span::current().record("request_id", tracing::field::display(request.id));

        self.shared.store.create_request(&request).await?;
        self.shared.metrics.request_accepted(count);

        self.launch(&request);

        Ok(CreateAck {
            request_id: request.id,
            message: CREATION_ACK.to_string(),
        })
    }

    /// Returns a snapshot of a request's status.
    ///
    /// `keys` is filled for `successful` requests, `message` for `failed`
    /// ones, and a `started` request yields the bare status. Calling this has
    /// no side effects.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if `request_id` is malformed or unknown.
    /// - [`Error::Store`] if the store cannot be read.
    pub async fn get_request_status(&self, request_id: &str) -> Result<StatusView> {
        let id: RequestId = request_id.parse().map_err(|_| Error::NotFound {
            request_id: request_id.to_owned(),
        })?;
        self.status_of(&id).await
    }

    /// Same as [`get_request_status`](Self::get_request_status) for an
    /// already parsed identifier.
    pub async fn status_of(&self, id: &RequestId) -> Result<StatusView> {
        let request = self.shared.store.get_request(id).await?;

        let view = match request.status {
            Status::Started => StatusView {
                status: Status::Started,
                keys: Vec::new(),
                message: None,
            },
            Status::Successful => StatusView {
                status: Status::Successful,
                keys: self.shared.store.list_keys(id).await?,
                message: None,
            },
            Status::Failed => StatusView {
                status: Status::Failed,
                keys: Vec::new(),
                message: request.error_message,
            },
        };
        Ok(view)
    }

    /// Reports whether the store is reachable.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] wrapping [`StoreError::Unavailable`](crate::StoreError::Unavailable).
    pub async fn health_check(&self) -> Result<()> {
        self.shared.store.health_check().await?;
        Ok(())
    }

    /// Number of processing tasks that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `timeout` for every in-flight processing task to finish.
    ///
    /// Tasks are never cancelled; any still running after the timeout keep
    /// running until the runtime shuts down. Returns `true` if all tasks
    /// finished in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        if drained {
            tracing::info!("all processing tasks finished");
        } else {
            tracing::warn!(
                in_flight = self.tracker.len(),
                "drain timed out; unfinished requests will remain started"
            );
        }
        // Re-open so clones can keep accepting work if the caller carries on.
        self.tracker.reopen();
        drained
    }

    fn launch(&self, request: &ValidatorRequest) {
        let task = ProcessingTask::new(
            Arc::clone(&self.shared),
            request.id,
            request.requested_count,
            request.fee_recipient.clone(),
            self.key_interval,
        );
        let span = tracing::info_span!(
            parent: None,
            "processing",
            request_id = %request.id,
            count = request.requested_count
        );
        self.tracker.spawn(
            async move {
                task.run().await;
            }
            .instrument(span),
        );
    }
}

fn validate(requested_count: i64, fee_recipient: &str) -> Result<(u64, FeeRecipient)> {
    let count = u64::try_from(requested_count)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::invalid_input("number of validators must be positive"))?;
    Ok((count, FeeRecipient::parse(fee_recipient)?))
}
