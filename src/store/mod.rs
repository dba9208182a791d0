//! Job storage contract consumed by the lifecycle engine.
//!
//! The store is the single source of truth for job status. Status changes go
//! through [`JobStore::update_status`], which is a compare-and-swap keyed on the
//! status the caller last observed; that is what keeps two concurrent triggers
//! from both starting the same job.

mod memory;

use chrono::{DateTime, Utc};

use crate::error::{JobError, StoreError};
use crate::state_machine::{Job, JobId, JobStatus, NewJob, Priority};

pub use memory::InMemoryJobStore;

/// Persistence for jobs.
pub trait JobStore: Send + Sync {
    /// Stores a new `pending` job, assigning its id and timestamps.
    fn insert(&self, job: NewJob) -> Result<Job, StoreError>;

    /// Looks up a job. `Ok(None)` when the id is unknown.
    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Jobs matching `filter`, newest `created_at` first.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError>;

    /// Applies `update` only if the stored status still equals `expected`.
    ///
    /// Fails with [`StoreError::Conflict`] otherwise. Nothing is written unless
    /// the updated record can be read back in full.
    fn update_status(
        &self,
        id: JobId,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<Job, StoreError>;

    /// The same compare-and-swap as [`update_status`](Self::update_status),
    /// without reading the record back.
    ///
    /// Used on failure paths, which must succeed even when the stored payload
    /// can no longer be decoded.
    fn set_status(
        &self,
        id: JobId,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<(), StoreError>;
}

/// A status change and the instant it happened.
///
/// The store stamps `updated_at` with `at`, and sets `completed_at` to `at`
/// when moving to `completed` (clearing it for any other status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(status: JobStatus, at: DateTime<Utc>) -> Self {
        Self { status, at }
    }

    pub fn now(status: JobStatus) -> Self {
        Self::new(status, Utc::now())
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        (self.status == JobStatus::Completed).then_some(self.at)
    }
}

/// Optional status and priority constraints for listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub priority: Option<Priority>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Builds a filter from raw query values. Empty strings mean "no filter".
    pub fn parse(status: Option<&str>, priority: Option<&str>) -> Result<Self, JobError> {
        let status = match status.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<JobStatus>()?),
            None => None,
        };
        let priority = match priority.filter(|p| !p.is_empty()) {
            Some(raw) => Some(raw.parse::<Priority>()?),
            None => None,
        };
        Ok(Self { status, priority })
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| s == job.status)
            && self.priority.is_none_or(|p| p == job.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_treats_empty_as_absent() {
        let filter = JobFilter::parse(Some(""), None).unwrap();
        assert_eq!(filter, JobFilter::all());
    }

    #[test]
    fn parse_reads_both_filters() {
        let filter = JobFilter::parse(Some("running"), Some("High")).unwrap();
        assert_eq!(filter.status, Some(JobStatus::Running));
        assert_eq!(filter.priority, Some(Priority::High));
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(matches!(
            JobFilter::parse(Some("done"), None),
            Err(JobError::Validation(_))
        ));
        assert!(matches!(
            JobFilter::parse(None, Some("urgent")),
            Err(JobError::Validation(_))
        ));
    }

    #[test]
    fn completed_at_only_for_completed() {
        let at = Utc::now();
        assert_eq!(StatusUpdate::new(JobStatus::Completed, at).completed_at(), Some(at));
        assert_eq!(StatusUpdate::new(JobStatus::Failed, at).completed_at(), None);
        assert_eq!(StatusUpdate::new(JobStatus::Running, at).completed_at(), None);
    }
}
