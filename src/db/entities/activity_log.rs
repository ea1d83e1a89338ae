use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit trail. Every isolate/reconnect outcome and every scan
/// failure writes one row; `properties` is a free-form JSON bag (actor,
/// outcome, error detail).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub action: String,
    pub subject_type: String,
    pub subject_id: Option<i32>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub properties: Option<Json>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    // Subject references are polymorphic (customer, router); no FK relations.
}

impl ActiveModelBehavior for ActiveModel {}
