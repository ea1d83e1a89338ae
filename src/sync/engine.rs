//! The reconciliation engine: one run converges the local customer,
//! package and status rows for one router against what the device reports.
//!
//! A run is at-least-once, not atomic: each customer update is its own
//! commit, and a failure mid-scan leaves already-synced customers in place
//! and the router marked inactive. Every field transition is idempotent, so
//! the next successful run converges the remainder.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::entities::{customer, router};
use crate::db::enums::CustomerStatus;
use crate::db::services::router_service;
use crate::routeros::{
    DeviceError, DeviceSession, HealthSnapshot, SessionBudget, TransportConnector, ops,
};
use crate::services::encryption_service::EncryptionError;
use crate::sync::store::{BillingStore, CustomerSyncUpdate, StoreError};

/// Known isolation-profile names, tried in this order when a router has no
/// profile configured. Matching is case-insensitive against the device's
/// profile list; the device's own spelling is what gets persisted.
pub const ISOLATION_PROFILE_CANDIDATES: [&str; 7] = [
    "isolirebilling",
    "isolir",
    "isolated",
    "nonpayment",
    "block",
    "suspend",
    "expired",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Resource info and online count only; feeds the live-status endpoint.
    HealthOnly,
    /// Secrets scan. With `dry_run` the run only counts mapped/orphaned
    /// secrets and writes nothing at all.
    Scan { dry_run: bool },
    /// Health and scan combined over one session; what the scheduler runs.
    Full,
}

impl SyncMode {
    // A dry run reads health too: the preview report should show what a real
    // pass would have recorded, it just never persists any of it.
    fn wants_health(self) -> bool {
        matches!(self, SyncMode::HealthOnly | SyncMode::Full) || self.is_dry_run()
    }

    fn wants_scan(self) -> bool {
        matches!(self, SyncMode::Scan { .. } | SyncMode::Full)
    }

    fn is_dry_run(self) -> bool {
        matches!(self, SyncMode::Scan { dry_run: true })
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("router credential error: {0}")]
    Credential(#[from] EncryptionError),
}

/// What one run did. Serialized as-is by the manual-sync endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Secrets with a non-empty name seen on the device.
    pub total_secrets: u32,
    /// Secrets that resolved to a local customer.
    pub mapped: u32,
    /// Secrets with no matching customer; never auto-created.
    pub orphaned: u32,
    pub synced_package: u32,
    pub synced_status: u32,
    pub health: Option<HealthSnapshot>,
}

pub struct SyncEngine {
    store: Arc<dyn BillingStore>,
    connector: Arc<dyn TransportConnector>,
    encryption_key: String,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn BillingStore>,
        connector: Arc<dyn TransportConnector>,
        encryption_key: String,
    ) -> Self {
        Self {
            store,
            connector,
            encryption_key,
        }
    }

    /// Runs one reconciliation pass against one router.
    ///
    /// On any failure of a non-dry-run pass the router is marked inactive
    /// with the attempt stamped; customer updates already applied stay
    /// applied. Safe to invoke concurrently for different routers.
    pub async fn sync_router(
        &self,
        router: &router::Model,
        mode: SyncMode,
        budget: SessionBudget,
    ) -> Result<SyncReport, SyncError> {
        let result = self.run(router, mode, budget).await;
        match &result {
            Ok(report) => {
                info!(
                    router_id = router.id,
                    mapped = report.mapped,
                    orphaned = report.orphaned,
                    synced_package = report.synced_package,
                    synced_status = report.synced_status,
                    "router sync finished"
                );
            }
            Err(e) => {
                error!(router_id = router.id, error = %e, "router sync failed");
                if !mode.is_dry_run() {
                    if let Err(mark_err) = self.store.mark_router_inactive(router.id).await {
                        error!(router_id = router.id, error = %mark_err, "failed to mark router inactive");
                    }
                }
            }
        }
        result
    }

    async fn run(
        &self,
        router: &router::Model,
        mode: SyncMode,
        budget: SessionBudget,
    ) -> Result<SyncReport, SyncError> {
        let endpoint = router_service::endpoint_for(router, &self.encryption_key)?;
        let mut session = DeviceSession::open(self.connector.as_ref(), &endpoint, budget).await?;
        let outcome = self.run_in_session(&mut session, router, mode).await;
        session.close().await;
        outcome
    }

    async fn run_in_session(
        &self,
        session: &mut DeviceSession,
        router: &router::Model,
        mode: SyncMode,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        let isolation_profile = match &router.isolation_profile {
            Some(p) => Some(p.clone()),
            None if mode.wants_scan() && !mode.is_dry_run() => {
                self.autodetect_isolation_profile(session, router).await
            }
            None => None,
        };

        if mode.wants_health() {
            match ops::resource_info(session).await {
                Ok(resource) => {
                    let mut snapshot = HealthSnapshot::from_resource(&resource);
                    match ops::list_active_sessions(session).await {
                        Ok(active) => snapshot.online_count = active.len() as i32,
                        Err(e) if e.is_connection() => return Err(e.into()),
                        Err(e) => {
                            warn!(router_id = router.id, error = %e, "active session count failed")
                        }
                    }
                    report.health = Some(snapshot);
                }
                Err(e) if e.is_connection() => return Err(e.into()),
                Err(e) => {
                    // The run can still converge customers off the secrets
                    // list; only a hard connection loss aborts it.
                    warn!(router_id = router.id, error = %e, "resource info failed, continuing without health");
                }
            }
        }

        if mode.wants_scan() {
            let secrets = ops::list_secrets(session).await?;
            if let Some(health) = report.health.as_mut() {
                health.total_account_count = secrets.len() as i32;
            }
            for secret in &secrets {
                let Some(account) = secret.name().filter(|n| !n.is_empty()) else {
                    continue;
                };
                report.total_secrets += 1;
                let Some(found) = self.store.find_customer_by_device_account(account).await?
                else {
                    report.orphaned += 1;
                    continue;
                };
                report.mapped += 1;
                if mode.is_dry_run() {
                    continue;
                }
                let update = self
                    .resolve_customer(
                        &found,
                        secret.profile(),
                        isolation_profile.as_deref(),
                        router.id,
                        &mut report,
                    )
                    .await?;
                self.store.apply_customer_update(&update).await?;
            }
        }

        if !mode.is_dry_run() {
            let customer_count = mode.wants_scan().then_some(report.mapped as i32);
            self.store
                .record_scan_success(router.id, report.health.as_ref(), customer_count)
                .await?;
        }

        Ok(report)
    }

    /// Computes the minimal update for one customer from its device-reported
    /// profile. Package resolution prefers a router-scoped package; the
    /// status rule only ever flips between `Active` and `Isolated`; a
    /// terminated or suspended customer is never disturbed by a profile
    /// mismatch.
    async fn resolve_customer(
        &self,
        found: &customer::Model,
        profile: Option<&str>,
        isolation_profile: Option<&str>,
        router_id: i32,
        report: &mut SyncReport,
    ) -> Result<CustomerSyncUpdate, SyncError> {
        let mut update = CustomerSyncUpdate {
            customer_id: found.id,
            router_id,
            package_id: None,
            status: None,
        };
        let Some(profile) = profile else {
            return Ok(update);
        };
        let on_isolation = isolation_profile == Some(profile);

        if !on_isolation {
            // A profile that matches neither a package nor the isolation
            // profile leaves the customer's package as it was.
            if let Some(package) = self.store.find_package_for_profile(profile, router_id).await? {
                if found.package_id != Some(package.id) {
                    update.package_id = Some(package.id);
                    report.synced_package += 1;
                }
            }
        }

        if isolation_profile.is_some() {
            if on_isolation {
                if found.status != CustomerStatus::Isolated {
                    update.status = Some(CustomerStatus::Isolated);
                    report.synced_status += 1;
                }
            } else if found.status == CustomerStatus::Isolated {
                update.status = Some(CustomerStatus::Active);
                report.synced_status += 1;
            }
        }

        Ok(update)
    }

    /// Best-effort: fetches the device's profile list and takes the first
    /// candidate that appears on it. Any failure here is logged and skipped;
    /// the run proceeds without an isolation profile.
    async fn autodetect_isolation_profile(
        &self,
        session: &mut DeviceSession,
        router: &router::Model,
    ) -> Option<String> {
        let profiles = match ops::list_profiles(session).await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(router_id = router.id, error = %e, "isolation profile auto-detect failed");
                return None;
            }
        };
        for candidate in ISOLATION_PROFILE_CANDIDATES {
            if let Some(found) = profiles
                .iter()
                .filter_map(|r| r.name())
                .find(|name| name.eq_ignore_ascii_case(candidate))
            {
                let found = found.to_string();
                info!(router_id = router.id, profile = %found, "auto-detected isolation profile");
                if let Err(e) = self.store.set_isolation_profile(router.id, &found).await {
                    warn!(router_id = router.id, error = %e, "failed to persist auto-detected isolation profile");
                }
                return Some(found);
            }
        }
        None
    }
}
