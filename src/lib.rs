//! Job lifecycle engine.
//!
//! Clients submit named jobs with a priority and an opaque JSON payload,
//! trigger them, and watch them move `pending -> running -> completed/failed`.
//! Completed jobs are announced to a webhook.
//!
//! The HTTP surface is left to the embedding application; it talks to
//! [`LifecycleEngine`] and maps [`JobError`] variants onto its own statuses.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod notifier;
pub mod state_machine;
pub mod store;
pub mod telemetry;

pub use adapter::{DelayAdapter, ExecutionAdapter};
pub use config::JobflowConfig;
pub use engine::{EngineOptions, JobEvent, LifecycleEngine, NotifyOutcome};
pub use error::{AdapterError, DeliveryError, JobError, StoreError};
pub use notifier::{Delivery, Notifier, WebhookNotifier, WebhookPayload};
pub use state_machine::{
    Acknowledgement, Job, JobId, JobStatus, LifecycleEvent, Priority, StateMachine,
    SubmitRequest, Transition,
};
pub use store::{InMemoryJobStore, JobFilter, JobStore, StatusUpdate};
