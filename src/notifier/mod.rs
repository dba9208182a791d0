//! Completion notifications.
//!
//! A [`Notifier`] is told about every job that reaches `completed`. Delivery is
//! best effort: failures come back as [`DeliveryError`] for the engine to log,
//! and never change the job's status.

mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DeliveryError;
use crate::state_machine::{Job, JobId, JobStatus, Priority};

pub use webhook::WebhookNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, job: &Job) -> Result<Delivery, DeliveryError>;
}

/// A notification attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The target accepted the event with this HTTP status.
    Sent { status: u16 },
    /// No target is configured.
    Disabled,
}

/// The job projection sent to the webhook target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub job_id: JobId,
    pub task_name: String,
    pub priority: Priority,
    pub payload: Value,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for WebhookPayload {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            task_name: job.task_name.clone(),
            priority: job.priority,
            payload: job.payload.clone(),
            status: job.status,
            completed_at: job.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_projects_the_completed_job() {
        let now = Utc::now();
        let job = Job {
            id: JobId::new(12),
            task_name: "Send Email".into(),
            priority: Priority::High,
            payload: json!({"to": "a@b.com"}),
            status: JobStatus::Completed,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        };

        let value = serde_json::to_value(WebhookPayload::from(&job)).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["completedAt", "jobId", "payload", "priority", "status", "taskName"]
        );
        assert_eq!(value["jobId"], 12);
        assert_eq!(value["status"], "completed");
        assert_eq!(value["payload"], json!({"to": "a@b.com"}));
    }
}
