//! In-process queue for enforcement jobs.
//!
//! Billing-state transitions enqueue; the periodic scheduler drains. A
//! released job comes back through the queue after its backoff delay via a
//! spawned timer task.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error};

use super::enforcement::{EnforcementJob, EnforcementRunner, JobOutcome};

pub struct JobQueue {
    tx: mpsc::UnboundedSender<EnforcementJob>,
    rx: Mutex<mpsc::UnboundedReceiver<EnforcementJob>>,
}

impl Default for JobQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, job: EnforcementJob) {
        debug!(job_id = %job.id, customer_id = job.customer_id, attempt = job.attempt, "job enqueued");
        // Send only fails when the receiver half is gone, i.e. at shutdown.
        let _ = self.tx.send(job);
    }

    /// Runs every currently-queued job to a disposition. Released jobs are
    /// re-enqueued after their delay; failed jobs are logged as terminal.
    /// Returns how many jobs were processed.
    pub async fn drain(self: &Arc<Self>, runner: &EnforcementRunner) -> usize {
        let mut processed = 0;
        loop {
            let job = {
                let mut rx = self.rx.lock().await;
                match rx.try_recv() {
                    Ok(job) => job,
                    Err(_) => break,
                }
            };
            let outcome = runner.run(&job).await;
            processed += 1;
            match outcome {
                JobOutcome::Succeeded => {}
                JobOutcome::Released(delay) => {
                    let queue = Arc::clone(self);
                    let retry = job.next_attempt();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        queue.enqueue(retry);
                    });
                }
                JobOutcome::Failed => {
                    error!(job_id = %job.id, customer_id = job.customer_id, "enforcement job failed terminally");
                }
            }
        }
        processed
    }
}
