//! Background enforcement jobs and their queue.

pub mod enforcement;
pub mod queue;

pub use enforcement::{
    BACKOFF_SCHEDULE, EnforcementAction, EnforcementJob, EnforcementRunner, JobOutcome,
    MAX_ATTEMPTS, backoff_delay,
};
pub use queue::JobQueue;
