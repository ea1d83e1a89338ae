//! Periodic background loops: a frequent health pass over active routers, a
//! slower full reconciliation pass, and the enforcement-queue drain.
//!
//! Each loop runs its work to completion before waiting for the next tick,
//! so a slow cycle delays the schedule instead of overlapping with itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::jobs::{EnforcementRunner, JobQueue};
use crate::routeros::SessionBudget;
use crate::sync::store::BillingStore;
use crate::sync::{SyncEngine, SyncMode};

pub const HEALTH_INTERVAL: Duration = Duration::from_secs(60);
pub const FULL_SCAN_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const QUEUE_DRAIN_INTERVAL: Duration = Duration::from_secs(10);

pub struct Scheduler {
    store: Arc<dyn BillingStore>,
    engine: Arc<SyncEngine>,
    queue: Arc<JobQueue>,
    runner: Arc<EnforcementRunner>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn BillingStore>,
        engine: Arc<SyncEngine>,
        queue: Arc<JobQueue>,
        runner: Arc<EnforcementRunner>,
    ) -> Self {
        Self {
            store,
            engine,
            queue,
            runner,
        }
    }

    /// Spawns the three loops. Tasks run until the process exits.
    pub fn spawn(self: Arc<Self>) {
        let health = Arc::clone(&self);
        tokio::spawn(async move {
            health
                .sync_loop(HEALTH_INTERVAL, SyncMode::HealthOnly, "health pass")
                .await;
        });

        let scan = Arc::clone(&self);
        tokio::spawn(async move {
            scan.sync_loop(FULL_SCAN_INTERVAL, SyncMode::Full, "full scan")
                .await;
        });

        tokio::spawn(async move {
            self.drain_loop().await;
        });
    }

    async fn sync_loop(&self, period: Duration, mode: SyncMode, label: &'static str) {
        info!(period_secs = period.as_secs(), label, "scheduler loop started");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let routers = match self.store.list_active_routers().await {
                Ok(routers) => routers,
                Err(e) => {
                    error!(label, error = %e, "failed to list routers, skipping cycle");
                    continue;
                }
            };
            for router in &routers {
                // sync_router logs its own outcome and marks the router
                // inactive on failure; one bad device must not stop the pass.
                let _ = self
                    .engine
                    .sync_router(router, mode, SessionBudget::DEFAULT)
                    .await;
            }
        }
    }

    async fn drain_loop(&self) {
        let mut interval = tokio::time::interval(QUEUE_DRAIN_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.queue.drain(&self.runner).await;
        }
    }
}
