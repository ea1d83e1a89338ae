use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::CustomerStatus;

/// A billing customer. `device_account` is the username the router knows
/// them by (the PPP secret name); `router_id` is the device the last scan
/// found that account on, or `None` while unmapped.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub device_account: String,
    pub router_id: Option<i32>,
    pub package_id: Option<i32>,
    pub status: CustomerStatus,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::router::Entity",
        from = "Column::RouterId",
        to = "super::router::Column::Id",
        on_delete = "SetNull"
    )]
    Router,

    #[sea_orm(
        belongs_to = "super::package::Entity",
        from = "Column::PackageId",
        to = "super::package::Column::Id",
        on_delete = "SetNull"
    )]
    Package,
}

impl Related<super::router::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Router.def()
    }
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
