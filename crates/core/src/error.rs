//! Error taxonomy shared by every dispatch component.

use thiserror::Error;

use crate::job::JobId;

/// Errors returned by the dispatch engine.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Caller supplied a station or item outside the allowed range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The queue (or the whole dispatcher) has been closed.
    #[error("dispatcher is closed")]
    Closed,

    /// A blocking wait was cancelled.
    #[error("operation canceled")]
    Canceled,

    /// The per-job tracking table is full; the job is still processed.
    #[error("tracking table full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    /// A job tried to take the station while already holding it.
    #[error("job {0} already holds the station")]
    StationReentry(JobId),

    /// The job body failed.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Workers did not drain before the shutdown deadline.
    #[error(
        "shutdown timed out: {dropped} dropped, {drained} drained, {abandoned} still in flight"
    )]
    ShutdownTimeout {
        dropped: usize,
        drained: usize,
        abandoned: usize,
    },

    /// The dispatcher could not be constructed from its configuration.
    #[error("invalid dispatcher configuration: {0}")]
    Config(String),
}

impl DispatchError {
    /// Whether this error is an expected consequence of shutting down.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, DispatchError::Closed | DispatchError::Canceled)
    }
}
