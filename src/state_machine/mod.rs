mod job;
mod state;

pub use job::{Acknowledgement, Job, JobId, JobStatus, NewJob, Priority, SubmitRequest};
pub use state::{LifecycleEvent, StateMachine, Transition};
