use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::{prelude::Router, router};
use crate::routeros::{DeviceEndpoint, HealthSnapshot};
use crate::services::encryption_service::{self, EncryptionError};

// --- Router Service Functions ---

pub async fn get_router_by_id(
    db: &DatabaseConnection,
    router_id: i32,
) -> Result<Option<router::Model>, DbErr> {
    Router::find_by_id(router_id).one(db).await
}

pub async fn list_routers(db: &DatabaseConnection) -> Result<Vec<router::Model>, DbErr> {
    Router::find().order_by_asc(router::Column::Id).all(db).await
}

/// Routers the periodic passes visit. A router marked inactive by a failed
/// scan stays out of the rotation until a manual sync brings it back.
pub async fn list_active_routers(db: &DatabaseConnection) -> Result<Vec<router::Model>, DbErr> {
    Router::find()
        .filter(router::Column::IsActive.eq(true))
        .order_by_asc(router::Column::Id)
        .all(db)
        .await
}

/// Creates a router, encrypting the API password before it touches the
/// database. The plaintext is write-only from the admin's perspective.
pub async fn create_router(
    db: &DatabaseConnection,
    name: &str,
    host: &str,
    port: u16,
    username: &str,
    password: &str,
    encryption_key: &str,
) -> Result<router::Model, DbErr> {
    let now = Utc::now();
    let password_encrypted = encryption_service::encrypt(password, encryption_key)
        .map_err(|e| DbErr::Custom(format!("failed to encrypt router password: {e}")))?;
    let active = router::ActiveModel {
        name: Set(name.to_owned()),
        host: Set(host.to_owned()),
        port: Set(port as i32),
        username: Set(username.to_owned()),
        password_encrypted: Set(password_encrypted),
        isolation_profile: Set(None),
        is_active: Set(true),
        cpu_load: Set(None),
        uptime: Set(None),
        version: Set(None),
        board_name: Set(None),
        online_count: Set(None),
        customer_count: Set(None),
        last_scan_at: Set(None),
        last_checked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    active.insert(db).await
}

/// Builds the connection endpoint for a stored router, decrypting the
/// credential in memory only.
pub fn endpoint_for(
    router: &router::Model,
    encryption_key: &str,
) -> Result<DeviceEndpoint, EncryptionError> {
    let password = encryption_service::decrypt(&router.password_encrypted, encryption_key)?;
    Ok(DeviceEndpoint {
        host: router.host.clone(),
        port: router.port as u16,
        username: router.username.clone(),
        password,
    })
}

/// Persists an auto-detected isolation profile. Never overwrites a profile
/// the operator has already configured.
pub async fn set_isolation_profile(
    db: &DatabaseConnection,
    router_id: i32,
    profile: &str,
) -> Result<(), DbErr> {
    let Some(model) = Router::find_by_id(router_id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("router {router_id}")));
    };
    if model.isolation_profile.is_some() {
        return Ok(());
    }
    let mut active = model.into_active_model();
    active.isolation_profile = Set(Some(profile.to_owned()));
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}

/// Writes the post-scan snapshot: marks the router active, stamps the scan
/// time, and updates whichever of health / mapped-customer-count the run
/// produced.
pub async fn record_scan_success(
    db: &DatabaseConnection,
    router_id: i32,
    health: Option<&HealthSnapshot>,
    customer_count: Option<i32>,
) -> Result<(), DbErr> {
    let Some(model) = Router::find_by_id(router_id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("router {router_id}")));
    };
    let now = Utc::now();
    let mut active = model.into_active_model();
    active.is_active = Set(true);
    active.last_scan_at = Set(Some(now));
    active.last_checked_at = Set(Some(now));
    active.updated_at = Set(now);
    if let Some(h) = health {
        active.cpu_load = Set(h.cpu_load.clone());
        active.uptime = Set(h.uptime.clone());
        active.version = Set(h.version.clone());
        active.board_name = Set(h.board_name.clone());
        active.online_count = Set(Some(h.online_count));
    }
    if let Some(count) = customer_count {
        active.customer_count = Set(Some(count));
    }
    active.update(db).await?;
    Ok(())
}

/// Marks a router unreachable after a failed run and stamps the attempt.
pub async fn mark_inactive(db: &DatabaseConnection, router_id: i32) -> Result<(), DbErr> {
    let Some(model) = Router::find_by_id(router_id).one(db).await? else {
        return Err(DbErr::RecordNotFound(format!("router {router_id}")));
    };
    let now = Utc::now();
    let mut active = model.into_active_model();
    active.is_active = Set(false);
    active.last_checked_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(db).await?;
    Ok(())
}
