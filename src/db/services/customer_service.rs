use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};

use crate::db::entities::{customer, prelude::Customer};
use crate::db::enums::CustomerStatus;

// --- Customer Service Functions ---

pub async fn get_customer_by_id(
    db: &DatabaseConnection,
    customer_id: i32,
) -> Result<Option<customer::Model>, DbErr> {
    Customer::find_by_id(customer_id).one(db).await
}

/// Exact match on the device account identifier (the PPP secret name).
/// Account names are unique across the deployment, so the lookup is global;
/// the scan re-binds the row to whichever router actually reported it.
pub async fn find_by_device_account(
    db: &DatabaseConnection,
    account: &str,
) -> Result<Option<customer::Model>, DbErr> {
    Customer::find()
        .filter(customer::Column::DeviceAccount.eq(account))
        .one(db)
        .await
}

/// Applies one scan resolution to one customer row. `package_id` / `status`
/// are `Some` only when the scan computed a change; the router binding is
/// always written, so a scanned secret re-binds its customer to the scanned
/// device even when nothing else moved.
pub async fn apply_sync_update(
    db: &DatabaseConnection,
    customer_id: i32,
    router_id: i32,
    package_id: Option<i32>,
    status: Option<CustomerStatus>,
) -> Result<(), DbErr> {
    let Some(model) = Customer::find_by_id(customer_id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("customer {customer_id}")));
    };
    let mut active = model.into_active_model();
    active.router_id = Set(Some(router_id));
    if let Some(package_id) = package_id {
        active.package_id = Set(Some(package_id));
    }
    if let Some(status) = status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}

/// Status write used by the enforcement job runner after the device applied
/// the change. Each transition is idempotent.
pub async fn set_status(
    db: &DatabaseConnection,
    customer_id: i32,
    status: CustomerStatus,
) -> Result<(), DbErr> {
    let Some(model) = Customer::find_by_id(customer_id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("customer {customer_id}")));
    };
    if model.status == status {
        return Ok(());
    }
    let mut active = model.into_active_model();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}
