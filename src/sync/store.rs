//! Store seams used by the reconciliation engine and the job runner.
//!
//! The relational store is an external collaborator; these traits pin down
//! exactly the keyed lookups and single-row updates the core needs. The
//! production implementation delegates to `db::services`; tests swap in an
//! in-memory store.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::error;

use crate::db::entities::{customer, package, router};
use crate::db::enums::CustomerStatus;
use crate::db::services;
use crate::routeros::HealthSnapshot;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// One scan resolution for one customer. `package_id` / `status` are set
/// only when the scan computed a change; the router binding always applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSyncUpdate {
    pub customer_id: i32,
    pub router_id: i32,
    pub package_id: Option<i32>,
    pub status: Option<CustomerStatus>,
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn get_router(&self, router_id: i32) -> Result<Option<router::Model>, StoreError>;

    async fn list_active_routers(&self) -> Result<Vec<router::Model>, StoreError>;

    async fn get_customer(&self, customer_id: i32)
        -> Result<Option<customer::Model>, StoreError>;

    async fn find_customer_by_device_account(
        &self,
        account: &str,
    ) -> Result<Option<customer::Model>, StoreError>;

    async fn get_package(&self, package_id: i32) -> Result<Option<package::Model>, StoreError>;

    /// Profile resolution with device-scoped precedence.
    async fn find_package_for_profile(
        &self,
        profile: &str,
        router_id: i32,
    ) -> Result<Option<package::Model>, StoreError>;

    async fn apply_customer_update(&self, update: &CustomerSyncUpdate) -> Result<(), StoreError>;

    async fn set_customer_status(
        &self,
        customer_id: i32,
        status: CustomerStatus,
    ) -> Result<(), StoreError>;

    async fn set_isolation_profile(
        &self,
        router_id: i32,
        profile: &str,
    ) -> Result<(), StoreError>;

    async fn record_scan_success(
        &self,
        router_id: i32,
        health: Option<&HealthSnapshot>,
        customer_count: Option<i32>,
    ) -> Result<(), StoreError>;

    async fn mark_router_inactive(&self, router_id: i32) -> Result<(), StoreError>;
}

/// Audit sink over the activity log. Writes are fire-and-forget from the
/// caller's point of view; the production impl logs its own failures.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record_activity(
        &self,
        action: &str,
        subject_type: &str,
        subject_id: Option<i32>,
        properties: serde_json::Value,
    );
}

/// SeaORM-backed store used in production.
pub struct OrmStore {
    db: DatabaseConnection,
}

impl OrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BillingStore for OrmStore {
    async fn get_router(&self, router_id: i32) -> Result<Option<router::Model>, StoreError> {
        Ok(services::get_router_by_id(&self.db, router_id).await?)
    }

    async fn list_active_routers(&self) -> Result<Vec<router::Model>, StoreError> {
        Ok(services::list_active_routers(&self.db).await?)
    }

    async fn get_customer(
        &self,
        customer_id: i32,
    ) -> Result<Option<customer::Model>, StoreError> {
        Ok(services::get_customer_by_id(&self.db, customer_id).await?)
    }

    async fn find_customer_by_device_account(
        &self,
        account: &str,
    ) -> Result<Option<customer::Model>, StoreError> {
        Ok(services::find_by_device_account(&self.db, account).await?)
    }

    async fn get_package(&self, package_id: i32) -> Result<Option<package::Model>, StoreError> {
        Ok(services::get_package_by_id(&self.db, package_id).await?)
    }

    async fn find_package_for_profile(
        &self,
        profile: &str,
        router_id: i32,
    ) -> Result<Option<package::Model>, StoreError> {
        Ok(services::find_for_profile(&self.db, profile, router_id).await?)
    }

    async fn apply_customer_update(&self, update: &CustomerSyncUpdate) -> Result<(), StoreError> {
        Ok(services::apply_sync_update(
            &self.db,
            update.customer_id,
            update.router_id,
            update.package_id,
            update.status,
        )
        .await?)
    }

    async fn set_customer_status(
        &self,
        customer_id: i32,
        status: CustomerStatus,
    ) -> Result<(), StoreError> {
        Ok(services::set_status(&self.db, customer_id, status).await?)
    }

    async fn set_isolation_profile(
        &self,
        router_id: i32,
        profile: &str,
    ) -> Result<(), StoreError> {
        Ok(services::set_isolation_profile(&self.db, router_id, profile).await?)
    }

    async fn record_scan_success(
        &self,
        router_id: i32,
        health: Option<&HealthSnapshot>,
        customer_count: Option<i32>,
    ) -> Result<(), StoreError> {
        Ok(services::record_scan_success(&self.db, router_id, health, customer_count).await?)
    }

    async fn mark_router_inactive(&self, router_id: i32) -> Result<(), StoreError> {
        Ok(services::mark_inactive(&self.db, router_id).await?)
    }
}

#[async_trait]
impl ActivitySink for OrmStore {
    async fn record_activity(
        &self,
        action: &str,
        subject_type: &str,
        subject_id: Option<i32>,
        properties: serde_json::Value,
    ) {
        if let Err(e) =
            services::record_activity(&self.db, action, subject_type, subject_id, properties).await
        {
            error!(action, error = %e, "failed to write activity log entry");
        }
    }
}
