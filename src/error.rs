use std::time::Duration;

use thiserror::Error;

use crate::state_machine::{JobId, JobStatus};

/// Errors returned to callers of the lifecycle engine.
///
/// `Validation`, `NotFound` and `InvalidState` never mutate state. `Store`
/// means the backing store itself failed.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job {id} is already {status}")]
    InvalidState { id: JobId, status: JobStatus },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by a [`JobStore`](crate::store::JobStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The conditional update lost: the stored status differs from the one
    /// the caller last observed.
    #[error("job {id} is {actual}, expected {expected}")]
    Conflict {
        id: JobId,
        expected: JobStatus,
        actual: JobStatus,
    },

    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Failure of an [`ExecutionAdapter`](crate::adapter::ExecutionAdapter) run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("execution failed: {0}")]
    Failed(String),

    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),

    #[error("execution was cancelled")]
    Cancelled,
}

/// Failure to deliver a completion notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build webhook client: {0}")]
    Client(String),

    #[error("webhook transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
}
