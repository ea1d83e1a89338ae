use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A service package. `profile` is the device-side profile name the router
/// actually tags secrets with; `router_id = None` makes the package global,
/// while a set `router_id` scopes it to one device. For a given
/// (profile, router) pair a device-scoped package always wins over a global
/// one during reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub profile: String,
    pub router_id: Option<i32>,
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

    #[sea_orm(has_many = "super::customer::Entity")]
    Customer,
}

impl Related<super::router::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Router.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
