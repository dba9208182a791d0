//! In-process job store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use super::{JobFilter, JobStore, StatusUpdate};
use crate::error::StoreError;
use crate::state_machine::{Job, JobId, JobStatus, NewJob, Priority};

/// Persisted layout of a job. The payload is kept serialized and decoded on
/// every read.
#[derive(Debug, Clone)]
struct StoredJob {
    id: JobId,
    task_name: String,
    priority: Priority,
    payload: String,
    status: JobStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl StoredJob {
    fn materialize(&self) -> Result<Job, StoreError> {
        Ok(Job {
            id: self.id,
            task_name: self.task_name.clone(),
            priority: self.priority,
            payload: serde_json::from_str(&self.payload)?,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

type Slot = Arc<Mutex<StoredJob>>;

/// Job store backed by a map of individually locked records.
///
/// The map lock is only held exclusively while inserting. Status updates take
/// it shared and then lock the one record they touch, so jobs with different
/// ids never wait on each other.
#[derive(Debug)]
pub struct InMemoryJobStore {
    records: RwLock<HashMap<JobId, Slot>>,
    next_id: AtomicU64,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn slot(&self, id: JobId) -> Result<Option<Slot>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&id).cloned())
    }

    fn slots(&self) -> Result<Vec<Slot>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().cloned().collect())
    }

    /// Compare-and-swap on one record. `check` runs against the updated copy
    /// and must pass before the copy replaces the stored record.
    fn swap<T>(
        &self,
        id: JobId,
        expected: JobStatus,
        update: StatusUpdate,
        check: impl FnOnce(&StoredJob) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let slot = self.slot(id)?.ok_or(StoreError::NotFound(id))?;
        let mut stored = slot.lock().map_err(|_| poisoned())?;

        if stored.status != expected {
            return Err(StoreError::Conflict {
                id,
                expected,
                actual: stored.status,
            });
        }

        let mut next = stored.clone();
        next.status = update.status;
        next.updated_at = update.at;
        next.completed_at = update.completed_at();

        let out = check(&next)?;
        *stored = next;
        Ok(out)
    }

    #[cfg(test)]
    fn overwrite_payload(&self, id: JobId, raw: &str) {
        let slot = self.slot(id).unwrap().unwrap();
        slot.lock().unwrap().payload = raw.to_string();
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("job table lock poisoned".into())
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: NewJob) -> Result<Job, StoreError> {
        let payload = serde_json::to_string(&job.payload)?;
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let now = Utc::now();

        let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let stored = StoredJob {
            id,
            task_name: job.task_name,
            priority: job.priority,
            payload,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        let materialized = stored.materialize()?;
        records.insert(id, Arc::new(Mutex::new(stored)));
        Ok(materialized)
    }

    fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let Some(slot) = self.slot(id)? else {
            return Ok(None);
        };
        let stored = slot.lock().map_err(|_| poisoned())?;
        stored.materialize().map(Some)
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let mut jobs = Vec::new();
        for slot in self.slots()? {
            let job = slot.lock().map_err(|_| poisoned())?.materialize()?;
            if filter.matches(&job) {
                jobs.push(job);
            }
        }

        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(jobs)
    }

    fn update_status(
        &self,
        id: JobId,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<Job, StoreError> {
        self.swap(id, expected, update, StoredJob::materialize)
    }

    fn set_status(
        &self,
        id: JobId,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> Result<(), StoreError> {
        self.swap(id, expected, update, |_| Ok(()))
    }
}
