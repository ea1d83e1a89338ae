//! Asynchronous enforcement of a single isolate/reconnect decision.
//!
//! Each job instance walks an explicit state machine:
//! `Pending -> Running -> {Succeeded, Released(delay), Failed}`. The retry
//! schedule is part of this module rather than delegated to a queue
//! framework, so it is directly testable.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::enums::CustomerStatus;
use crate::routeros::{DeviceError, DeviceSession, SessionBudget, TransportConnector, ops};
use crate::services::encryption_service::EncryptionError;
use crate::sync::store::{ActivitySink, BillingStore, StoreError};
use crate::db::services::router_service;

/// Max attempts before a job fails terminally.
pub const MAX_ATTEMPTS: u32 = 3;

/// Release delays indexed by how many attempts have failed; attempts past
/// the end of the schedule clamp to the last entry.
pub const BACKOFF_SCHEDULE: [Duration; 3] = [
    Duration::from_secs(60),
    Duration::from_secs(180),
    Duration::from_secs(600),
];

/// Delay before retry number `attempt + 1`, where `attempt` counts failures
/// so far (1-based by the time a delay is needed).
pub fn backoff_delay(attempt: u32) -> Duration {
    let index = (attempt.max(1) as usize - 1).min(BACKOFF_SCHEDULE.len() - 1);
    BACKOFF_SCHEDULE[index]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementAction {
    Isolate,
    Reconnect,
}

impl EnforcementAction {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementAction::Isolate => "customer.isolate",
            EnforcementAction::Reconnect => "customer.reconnect",
        }
    }

    fn target_status(self) -> CustomerStatus {
        match self {
            EnforcementAction::Isolate => CustomerStatus::Isolated,
            EnforcementAction::Reconnect => CustomerStatus::Active,
        }
    }
}

/// One queued enforcement decision. `attempt` counts failed attempts so far;
/// a released job re-enters the queue with it bumped.
#[derive(Debug, Clone)]
pub struct EnforcementJob {
    pub id: Uuid,
    pub customer_id: i32,
    pub action: EnforcementAction,
    pub attempt: u32,
}

impl EnforcementJob {
    pub fn new(customer_id: i32, action: EnforcementAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            action,
            attempt: 0,
        }
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

/// Terminal disposition of one run of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    /// Transient failure; re-enqueue after the delay.
    Released(Duration),
    /// Out of attempts; surfaced to operator-visible failure tracking.
    Failed,
}

#[derive(Error, Debug)]
enum JobError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("router credential error: {0}")]
    Credential(#[from] EncryptionError),
    #[error("customer {0} not found")]
    UnknownCustomer(i32),
    #[error("router {0} not found")]
    UnknownRouter(i32),
    #[error("router {0} has no isolation profile configured")]
    NoIsolationProfile(i32),
}

enum Applied {
    /// Device accepted the change; local status updated.
    Done { router_id: i32 },
    /// The device has no matching secret; nothing to do (not an error).
    NotOnDevice { router_id: i32 },
    /// Customer has no assigned router; the job is a no-op.
    NoRouter,
}

pub struct EnforcementRunner {
    store: Arc<dyn BillingStore>,
    audit: Arc<dyn ActivitySink>,
    connector: Arc<dyn TransportConnector>,
    encryption_key: String,
    budget: SessionBudget,
}

impl EnforcementRunner {
    pub fn new(
        store: Arc<dyn BillingStore>,
        audit: Arc<dyn ActivitySink>,
        connector: Arc<dyn TransportConnector>,
        encryption_key: String,
    ) -> Self {
        Self {
            store,
            audit,
            connector,
            encryption_key,
            budget: SessionBudget::DEFAULT,
        }
    }

    /// Runs the job once and reports its disposition. The caller (queue)
    /// owns re-enqueueing on `Released`.
    pub async fn run(&self, job: &EnforcementJob) -> JobOutcome {
        let attempt = job.attempt + 1;
        match self.try_apply(job).await {
            Ok(Applied::Done { router_id }) => {
                self.audit
                    .record_activity(
                        job.action.as_str(),
                        "customer",
                        Some(job.customer_id),
                        json!({
                            "outcome": "applied",
                            "router_id": router_id,
                            "attempt": attempt,
                        }),
                    )
                    .await;
                JobOutcome::Succeeded
            }
            Ok(Applied::NotOnDevice { router_id }) => {
                // The local status is left alone on purpose: the device has
                // no record to act on.
                warn!(
                    customer_id = job.customer_id,
                    router_id,
                    action = job.action.as_str(),
                    "account not found on device, nothing to enforce"
                );
                JobOutcome::Succeeded
            }
            Ok(Applied::NoRouter) => {
                info!(
                    customer_id = job.customer_id,
                    action = job.action.as_str(),
                    "customer has no router assigned, skipped"
                );
                JobOutcome::Succeeded
            }
            Err(e) => {
                self.audit
                    .record_activity(
                        job.action.as_str(),
                        "customer",
                        Some(job.customer_id),
                        json!({
                            "outcome": "error",
                            "error": e.to_string(),
                            "attempt": attempt,
                        }),
                    )
                    .await;
                if attempt < MAX_ATTEMPTS {
                    let delay = backoff_delay(attempt);
                    warn!(
                        customer_id = job.customer_id,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "enforcement attempt failed, releasing"
                    );
                    JobOutcome::Released(delay)
                } else {
                    error!(
                        customer_id = job.customer_id,
                        attempt,
                        error = %e,
                        "enforcement failed terminally"
                    );
                    JobOutcome::Failed
                }
            }
        }
    }

    async fn try_apply(&self, job: &EnforcementJob) -> Result<Applied, JobError> {
        let customer = self
            .store
            .get_customer(job.customer_id)
            .await?
            .ok_or(JobError::UnknownCustomer(job.customer_id))?;
        let Some(router_id) = customer.router_id else {
            return Ok(Applied::NoRouter);
        };
        let router = self
            .store
            .get_router(router_id)
            .await?
            .ok_or(JobError::UnknownRouter(router_id))?;

        let endpoint = router_service::endpoint_for(&router, &self.encryption_key)?;
        let mut session =
            DeviceSession::open(self.connector.as_ref(), &endpoint, self.budget).await?;
        let applied = self.apply_action(&mut session, job, &customer, &router).await;
        session.close().await;

        if applied? {
            self.store
                .set_customer_status(customer.id, job.action.target_status())
                .await?;
            Ok(Applied::Done { router_id })
        } else {
            Ok(Applied::NotOnDevice { router_id })
        }
    }

    async fn apply_action(
        &self,
        session: &mut DeviceSession,
        job: &EnforcementJob,
        customer: &crate::db::entities::customer::Model,
        router: &crate::db::entities::router::Model,
    ) -> Result<bool, JobError> {
        match job.action {
            EnforcementAction::Isolate => {
                let isolation_profile = router
                    .isolation_profile
                    .as_deref()
                    .ok_or(JobError::NoIsolationProfile(router.id))?;
                Ok(ops::isolate(session, &customer.device_account, isolation_profile).await?)
            }
            EnforcementAction::Reconnect => {
                // Restore the customer's package profile when one is known;
                // otherwise the device default.
                let target = match customer.package_id {
                    Some(package_id) => self
                        .store
                        .get_package(package_id)
                        .await?
                        .map(|p| p.profile),
                    None => None,
                };
                Ok(
                    ops::reconnect(session, &customer.device_account, target.as_deref())
                        .await?,
                )
            }
        }
    }
}
