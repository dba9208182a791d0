//! The unit of work run once a job enters `running`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::state_machine::Job;

/// Performs the work behind a job.
///
/// Called once per successful trigger, on a task of its own. Implementations
/// may take any amount of time and may fail; the engine maps the result onto
/// the job's status.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<(), AdapterError>;
}

/// Placeholder work: waits a fixed delay and succeeds.
#[derive(Debug, Clone, Copy)]
pub struct DelayAdapter {
    delay: Duration,
}

impl DelayAdapter {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for DelayAdapter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl ExecutionAdapter for DelayAdapter {
    async fn execute(&self, job: &Job) -> Result<(), AdapterError> {
        tracing::debug!(job_id = %job.id, delay_ms = self.delay.as_millis() as u64, "simulating work");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{JobId, JobStatus, Priority};
    use chrono::Utc;
    use serde_json::json;

    fn job() -> Job {
        let now = Utc::now();
        Job {
            id: JobId::new(1),
            task_name: "noop".into(),
            priority: Priority::Low,
            payload: json!({}),
            status: JobStatus::Running,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn default_delay_is_three_seconds() {
        assert_eq!(DelayAdapter::default().delay(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_adapter_waits_then_succeeds() {
        let adapter = DelayAdapter::new(Duration::from_secs(3));
        let started = tokio::time::Instant::now();

        adapter.execute(&job()).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
