use super::Shared;
use crate::{
    FeeRecipient, KeyGenerator, Metrics, RequestId, Status, Store, TaskOutcome, ValidatorKey,
};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

/// Diagnostic stored on a request whose key generation failed.
pub const KEYGEN_FAILED: &str = "Error generating validator keys";

/// Diagnostic stored on a request whose key persistence failed.
pub const PERSIST_FAILED: &str = "Error saving validator keys";

/// Phase in which a processing task stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailurePhase {
    Generate,
    Persist,
}

impl FailurePhase {
    const fn message(self) -> &'static str {
        match self {
            Self::Generate => KEYGEN_FAILED,
            Self::Persist => PERSIST_FAILED,
        }
    }
}

/// The background unit of work launched once per accepted request.
///
/// It is the only writer of its request's status after creation, and it
/// writes that status exactly once.
pub(crate) struct ProcessingTask<S, K, M> {
    shared: Arc<Shared<S, K, M>>,
    request_id: RequestId,
    count: u64,
    fee_recipient: FeeRecipient,
    key_interval: Duration,
}

impl<S, K, M> ProcessingTask<S, K, M>
where
    S: Store,
    K: KeyGenerator,
    M: Metrics,
{
    pub(crate) fn new(
        shared: Arc<Shared<S, K, M>>,
        request_id: RequestId,
        count: u64,
        fee_recipient: FeeRecipient,
        key_interval: Duration,
    ) -> Self {
        Self {
            shared,
            request_id,
            count,
            fee_recipient,
            key_interval,
        }
    }

    /// Generates and persists every key, then writes the terminal status.
    ///
    /// # Behavior
    ///
    /// - Keys are produced strictly one after another.
    /// - The first generation or persistence failure stops the loop; keys
    ///   saved before it are kept.
    /// - Exactly one terminal status write is attempted. If it fails the
    ///   request stays `started` and [`TaskOutcome::Stuck`] is returned.
    pub(crate) async fn run(self) -> TaskOutcome {
        let start = Instant::now();
        self.shared.metrics.task_started();
        tracing::info!("starting validator creation");

        let (status, message) = match self.generate_all().await {
            Ok(()) => (Status::Successful, None),
            Err(phase) => (Status::Failed, Some(phase.message())),
        };

        let outcome = match self
            .shared
            .store
            .update_status(&self.request_id, status, message)
            .await
        {
            Ok(()) if status == Status::Successful => TaskOutcome::Successful,
            Ok(()) => TaskOutcome::Failed,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    intended = %status,
                    "failed to write terminal status; request left in started"
                );
                TaskOutcome::Stuck
            }
        };

        let elapsed = start.elapsed();
        self.shared.metrics.task_finished(outcome, elapsed);

        match outcome {
            TaskOutcome::Successful => tracing::info!(
                duration_ms = elapsed.as_millis() as u64,
                "validator creation completed successfully"
            ),
            TaskOutcome::Failed => tracing::warn!(
                duration_ms = elapsed.as_millis() as u64,
                reason = message.unwrap_or_default(),
                "validator creation failed"
            ),
            TaskOutcome::Stuck => {}
        }
        outcome
    }

    async fn generate_all(&self) -> Result<(), FailurePhase> {
        for index in 1..=self.count {
            if !self.key_interval.is_zero() {
                tokio::time::sleep(self.key_interval).await;
            }

            let value = self.shared.keygen.generate().map_err(|e| {
                tracing::error!(error = %e, index, "failed to generate key");
                FailurePhase::Generate
            })?;

            let key = ValidatorKey::new(self.request_id, value, self.fee_recipient.clone());
            self.shared.store.save_key(&key).await.map_err(|e| {
                tracing::error!(error = %e, index, "failed to save validator key");
                FailurePhase::Persist
            })?;

            self.shared.metrics.key_generated();
            tracing::debug!(index, key_id = %key.id, "generated validator key");
        }
        Ok(())
    }
}
