//! Observability hooks for the orchestrator.
//!
//! The orchestrator reports through an injected [`Metrics`] value instead of
//! process-wide globals, so the core stays testable without a metrics backend.
//! Every hook is fire-and-forget: implementations must not block and cannot
//! fail the caller.

use core::time::Duration;

/// How a processing task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskOutcome {
    /// All keys persisted and the `successful` status was written.
    Successful,
    /// Processing stopped early and the `failed` status was written.
    Failed,
    /// The terminal status write itself failed; the request stays `started`.
    Stuck,
}

impl TaskOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Stuck => "stuck",
        }
    }
}

/// Sink for orchestrator counters and histograms.
///
/// All methods default to no-ops so implementors only override what they
/// export.
pub trait Metrics: Send + Sync + 'static {
    /// A creation call passed validation and was persisted.
    fn request_accepted(&self, _requested_count: u64) {}

    /// A creation call was rejected before persisting anything.
    fn request_rejected(&self) {}

    /// A processing task was launched.
    fn task_started(&self) {}

    /// A key was generated and persisted.
    fn key_generated(&self) {}

    /// A processing task finished.
    fn task_finished(&self, _outcome: TaskOutcome, _elapsed: Duration) {}
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}
