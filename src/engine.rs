//! The job lifecycle engine.
//!
//! [`LifecycleEngine`] owns the `submit -> trigger -> complete/fail` protocol.
//! A trigger moves the job to `running` with a compare-and-swap and returns at
//! once. The work then runs on its own task and reports back through a oneshot
//! channel; a second task applies the outcome and, for successful jobs, calls
//! the notifier. A job that reached `running` always leaves it: adapter errors,
//! timeouts, panics, cancellation and store faults all end in `failed`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::adapter::{DelayAdapter, ExecutionAdapter};
use crate::config::JobflowConfig;
use crate::error::{AdapterError, DeliveryError, JobError, StoreError};
use crate::notifier::{Delivery, Notifier, WebhookNotifier};
use crate::state_machine::{
    Acknowledgement, Job, JobId, JobStatus, LifecycleEvent, StateMachine, SubmitRequest,
    Transition,
};
use crate::store::{InMemoryJobStore, JobFilter, JobStore, StatusUpdate};

/// Something observable that happened to a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The job's status changed.
    Transitioned {
        job_id: JobId,
        transition: Transition,
        at: DateTime<Utc>,
    },
    /// A completion notification was attempted.
    Notified {
        job_id: JobId,
        outcome: NotifyOutcome,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Transitioned { job_id, .. } | JobEvent::Notified { job_id, .. } => *job_id,
        }
    }
}

/// Result of a notification attempt, as carried on the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { status: u16 },
    Disabled,
    Failed(String),
}

impl From<&Result<Delivery, DeliveryError>> for NotifyOutcome {
    fn from(result: &Result<Delivery, DeliveryError>) -> Self {
        match result {
            Ok(Delivery::Sent { status }) => NotifyOutcome::Sent { status: *status },
            Ok(Delivery::Disabled) => NotifyOutcome::Disabled,
            Err(e) => NotifyOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Bound on a single adapter run; overrun fails the job.
    pub execution_timeout: Option<Duration>,
    /// Buffer size of the event channel. Slow subscribers miss old events.
    pub event_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            execution_timeout: None,
            event_capacity: 256,
        }
    }
}

struct Inner {
    store: Arc<dyn JobStore>,
    adapter: Arc<dyn ExecutionAdapter>,
    notifier: Arc<dyn Notifier>,
    execution_timeout: Option<Duration>,
    events: broadcast::Sender<JobEvent>,
    in_flight: Mutex<HashMap<JobId, AbortHandle>>,
}

/// Enforces job status transitions and drives execution.
///
/// Cheap to clone; clones share the same store and in-flight set.
#[derive(Clone)]
pub struct LifecycleEngine {
    inner: Arc<Inner>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn JobStore>,
        adapter: Arc<dyn ExecutionAdapter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_options(store, adapter, notifier, EngineOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn JobStore>,
        adapter: Arc<dyn ExecutionAdapter>,
        notifier: Arc<dyn Notifier>,
        options: EngineOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                store,
                adapter,
                notifier,
                execution_timeout: options.execution_timeout,
                events,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// In-memory store, placeholder adapter and webhook notifier, all set up
    /// from `config`.
    pub fn from_config(config: &JobflowConfig) -> Result<Self, DeliveryError> {
        let notifier =
            WebhookNotifier::with_timeout(config.webhook_url.clone(), config.webhook_timeout())?;
        Ok(Self::with_options(
            InMemoryJobStore::arc(),
            Arc::new(DelayAdapter::new(config.execution_delay())),
            Arc::new(notifier),
            EngineOptions {
                execution_timeout: config.execution_timeout(),
                event_capacity: config.event_capacity,
            },
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Validates and stores a new `pending` job.
    pub fn submit(&self, request: SubmitRequest) -> Result<Job, JobError> {
        let new_job = request.validate()?;
        let job = self.inner.store.insert(new_job)?;
        info!(
            job_id = %job.id,
            task_name = %job.task_name,
            priority = %job.priority,
            "job submitted"
        );
        Ok(job)
    }

    pub fn get(&self, id: JobId) -> Result<Job, JobError> {
        self.inner.store.get(id)?.ok_or(JobError::NotFound(id))
    }

    /// Jobs matching `filter`, newest first.
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError> {
        Ok(self.inner.store.list(filter)?)
    }

    /// Starts a `pending` (or previously `failed`) job.
    ///
    /// Returns as soon as the job is `running`; the work itself happens in the
    /// background. Of several concurrent triggers on one job, exactly one
    /// succeeds and the rest get [`JobError::InvalidState`].
    pub async fn trigger(&self, id: JobId) -> Result<Acknowledgement, JobError> {
        let job = self.get(id)?;
        let running = self.apply(id, job.status, LifecycleEvent::Trigger)?;

        if job.status == JobStatus::Failed {
            info!(job_id = %id, "retrying failed job");
        }
        info!(job_id = %id, task_name = %running.task_name, "job started");

        self.spawn_execution(running);
        Ok(Acknowledgement::started(id))
    }

    /// Aborts the in-flight execution of `id`. The job then fails.
    /// Returns `false` if nothing was running for it.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.in_flight().get(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every in-flight execution and returns how many there were.
    pub fn shutdown(&self) -> usize {
        let in_flight = self.in_flight();
        for handle in in_flight.values() {
            handle.abort();
        }
        in_flight.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight().len()
    }

    fn spawn_execution(&self, job: Job) {
        let id = job.id;
        let (tx, rx) = oneshot::channel();
        let adapter = Arc::clone(&self.inner.adapter);
        let limit = self.inner.execution_timeout;

        let worker = tokio::spawn(async move {
            let outcome = run_adapter(adapter.as_ref(), &job, limit).await;
            let _ = tx.send(outcome);
        });
        self.in_flight().insert(id, worker.abort_handle());

        let engine = self.clone();
        tokio::spawn(async move {
            // A closed channel means the worker was aborted or panicked.
            let outcome = rx.await.unwrap_or(Err(AdapterError::Cancelled));
            engine.in_flight().remove(&id);
            engine.complete(id, outcome).await;
        });
    }

    /// Applies an execution outcome to a `running` job.
    async fn complete(&self, id: JobId, outcome: Result<(), AdapterError>) {
        match outcome {
            Ok(()) => {
                if let Err(err) = self.finish(id).await {
                    error!(job_id = %id, error = %err, "failed to record completion");
                    self.fail(id, LifecycleEvent::CompletionFaulted);
                }
            }
            Err(err) => {
                warn!(job_id = %id, error = %err, "job execution failed");
                self.fail(id, LifecycleEvent::ExecutionFailed);
            }
        }
    }

    async fn finish(&self, id: JobId) -> Result<(), JobError> {
        let job = self.apply(id, JobStatus::Running, LifecycleEvent::ExecutionSucceeded)?;
        info!(job_id = %id, "job completed");

        let result = self.inner.notifier.notify(&job).await;
        match &result {
            Ok(Delivery::Sent { status }) => info!(job_id = %id, status, "webhook delivered"),
            Ok(Delivery::Disabled) => debug!(job_id = %id, "webhook disabled"),
            Err(err) => warn!(job_id = %id, error = %err, "webhook delivery failed"),
        }
        self.publish(JobEvent::Notified {
            job_id: id,
            outcome: NotifyOutcome::from(&result),
        });
        Ok(())
    }

    /// Moves a `running` job to `failed` without reading it back.
    fn fail(&self, id: JobId, event: LifecycleEvent) {
        let Some(transition) = StateMachine::next(JobStatus::Running, event) else {
            return;
        };
        let update = StatusUpdate::now(transition.to);
        match self.inner.store.set_status(id, transition.from, update) {
            Ok(()) => {
                info!(job_id = %id, reason = %event, "job failed");
                self.publish(JobEvent::Transitioned {
                    job_id: id,
                    transition,
                    at: update.at,
                });
            }
            Err(err) => error!(job_id = %id, error = %err, "failed to mark job failed"),
        }
    }

    /// Runs `event` against a job last seen in `from`, writing the result
    /// with a conditional update.
    fn apply(&self, id: JobId, from: JobStatus, event: LifecycleEvent) -> Result<Job, JobError> {
        let transition =
            StateMachine::next(from, event).ok_or(JobError::InvalidState { id, status: from })?;
        let update = StatusUpdate::now(transition.to);

        let job = self
            .inner
            .store
            .update_status(id, from, update)
            .map_err(|err| match err {
                StoreError::Conflict { actual, .. } => JobError::InvalidState { id, status: actual },
                StoreError::NotFound(id) => JobError::NotFound(id),
                other => JobError::Store(other),
            })?;

        debug!(job_id = %id, from = %transition.from, to = %transition.to, "status changed");
        self.publish(JobEvent::Transitioned {
            job_id: id,
            transition,
            at: update.at,
        });
        Ok(job)
    }

    fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<JobId, AbortHandle>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn run_adapter(
    adapter: &dyn ExecutionAdapter,
    job: &Job,
    limit: Option<Duration>,
) -> Result<(), AdapterError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, adapter.execute(job))
            .await
            .unwrap_or(Err(AdapterError::TimedOut(limit))),
        None => adapter.execute(job).await,
    }
}
