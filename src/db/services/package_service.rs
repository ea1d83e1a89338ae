use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::db::entities::{package, prelude::Package};

// --- Package Service Functions ---

pub async fn get_package_by_id(
    db: &DatabaseConnection,
    package_id: i32,
) -> Result<Option<package::Model>, DbErr> {
    Package::find_by_id(package_id).one(db).await
}

/// Resolves the package for a device-reported profile name.
///
/// A package scoped to the scanned router always wins over a global one with
/// the same profile name; packages scoped to *other* routers never match.
pub async fn find_for_profile(
    db: &DatabaseConnection,
    profile: &str,
    router_id: i32,
) -> Result<Option<package::Model>, DbErr> {
    let scoped = Package::find()
        .filter(package::Column::Profile.eq(profile))
        .filter(package::Column::RouterId.eq(router_id))
        .one(db)
        .await?;
    if scoped.is_some() {
        return Ok(scoped);
    }
    Package::find()
        .filter(package::Column::Profile.eq(profile))
        .filter(package::Column::RouterId.is_null())
        .one(db)
        .await
}
