use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// Something that happened to a job and may move its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// A caller asked for the job to run.
    Trigger,
    /// The execution adapter reported success.
    ExecutionSucceeded,
    /// The execution adapter reported failure, timed out, or was cancelled.
    ExecutionFailed,
    /// Writing the completed state failed after a successful execution.
    CompletionFaulted,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Trigger => write!(f, "TRIGGER"),
            LifecycleEvent::ExecutionSucceeded => write!(f, "EXECUTION_SUCCEEDED"),
            LifecycleEvent::ExecutionFailed => write!(f, "EXECUTION_FAILED"),
            LifecycleEvent::CompletionFaulted => write!(f, "COMPLETION_FAULTED"),
        }
    }
}

/// An accepted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub event: LifecycleEvent,
}

impl Transition {
    /// `failed -> running`: a failed job being run again.
    pub fn is_retry(&self) -> bool {
        self.from == JobStatus::Failed && self.event == LifecycleEvent::Trigger
    }
}

/// The job transition table.
///
/// ```text
/// pending  --Trigger-------------> running
/// failed   --Trigger (retry)-----> running
/// running  --ExecutionSucceeded--> completed
/// running  --ExecutionFailed-----> failed
/// running  --CompletionFaulted---> failed
/// ```
///
/// Every other pair is rejected. `completed` has no outgoing edge.
pub struct StateMachine;

impl StateMachine {
    /// Returns the transition `event` causes from `from`, or `None` if the
    /// pair is not allowed.
    pub fn next(from: JobStatus, event: LifecycleEvent) -> Option<Transition> {
        use JobStatus::*;
        use LifecycleEvent::*;

        let to = match (from, event) {
            (Pending, Trigger) | (Failed, Trigger) => Running,
            (Running, ExecutionSucceeded) => Completed,
            (Running, ExecutionFailed) | (Running, CompletionFaulted) => Failed,
            _ => return None,
        };

        Some(Transition { from, to, event })
    }

    pub fn can_trigger(from: JobStatus) -> bool {
        Self::next(from, LifecycleEvent::Trigger).is_some()
    }
}
