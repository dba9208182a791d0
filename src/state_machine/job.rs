use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JobError;

/// Store-assigned job identifier. Ids are handed out in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(JobId)
            .map_err(|_| JobError::Validation(format!("invalid job id: {s:?}")))
    }
}

/// Advisory priority. Nothing schedules by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = JobError;

    /// Matches the exact wire spelling only (`Low`, `Medium`, `High`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| JobError::Validation("priority must be Low, Medium, or High".into()))
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `Failed` counts as terminal even though it may be retried.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(JobError::Validation(format!("unknown status: {other:?}"))),
        }
    }
}

/// A job as returned to callers, with its payload already deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub task_name: String,
    pub priority: Priority,
    pub payload: Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Submission input as it arrives from the outer layer: present, not yet
/// semantically checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub task_name: String,
    pub priority: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl SubmitRequest {
    pub fn new(task_name: impl Into<String>, priority: impl Into<String>, payload: Value) -> Self {
        Self {
            task_name: task_name.into(),
            priority: priority.into(),
            payload: Some(payload),
        }
    }

    /// Checks the request and produces the record to insert.
    /// A missing or `null` payload becomes `{}`.
    pub fn validate(self) -> Result<NewJob, JobError> {
        let task_name = self.task_name.trim();
        if task_name.is_empty() {
            return Err(JobError::Validation("taskName is required".into()));
        }
        if self.priority.is_empty() {
            return Err(JobError::Validation("priority is required".into()));
        }
        let priority = self.priority.parse::<Priority>()?;

        Ok(NewJob {
            task_name: task_name.to_string(),
            priority,
            payload: self
                .payload
                .filter(|p| !p.is_null())
                .unwrap_or_else(|| Value::Object(Default::default())),
        })
    }
}

/// A validated job waiting for the store to assign its id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub task_name: String,
    pub priority: Priority,
    pub payload: Value,
}

/// Returned by a successful trigger, before the work has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub message: String,
    pub job_id: JobId,
}

impl Acknowledgement {
    pub fn started(job_id: JobId) -> Self {
        Self {
            message: "Job started".to_string(),
            job_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_parses_exact_spelling_only() {
        assert_eq!("High".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("Low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("high".parse::<Priority>().is_err());
        assert!("Urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn status_display_and_parse_agree() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn validate_rejects_blank_task_name() {
        let err = SubmitRequest::new("   ", "High", json!({}))
            .validate()
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
    }

    #[test]
    fn validate_rejects_missing_priority() {
        let req = SubmitRequest {
            task_name: "Send Email".into(),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(JobError::Validation(_))));
    }

    #[test]
    fn validate_defaults_payload_to_empty_object() {
        let req = SubmitRequest {
            task_name: " Send Email ".into(),
            priority: "Medium".into(),
            payload: None,
        };
        let new_job = req.validate().unwrap();
        assert_eq!(new_job.task_name, "Send Email");
        assert_eq!(new_job.priority, Priority::Medium);
        assert_eq!(new_job.payload, json!({}));

        let explicit_null = SubmitRequest::new("Send Email", "Low", Value::Null);
        assert_eq!(explicit_null.validate().unwrap().payload, json!({}));
    }

    #[test]
    fn job_serializes_in_camel_case() {
        let now = Utc::now();
        let job = Job {
            id: JobId::new(7),
            task_name: "Send Email".into(),
            priority: Priority::High,
            payload: json!({"to": "a@b.com"}),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["taskName"], "Send Email");
        assert_eq!(value["priority"], "High");
        assert_eq!(value["status"], "pending");
        assert!(value["completedAt"].is_null());
    }

    #[test]
    fn acknowledgement_shape() {
        let ack = Acknowledgement::started(JobId::new(3));
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value, json!({"message": "Job started", "jobId": 3}));
    }

    #[test]
    fn job_id_parses_from_path_segment() {
        assert_eq!("42".parse::<JobId>().unwrap(), JobId::new(42));
        assert!("abc".parse::<JobId>().is_err());
    }
}
