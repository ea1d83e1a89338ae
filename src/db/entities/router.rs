use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A managed network device. The health snapshot columns are written
/// exclusively by the reconciliation engine after a session; `password_encrypted`
/// holds the API credential AES-GCM encrypted at rest and is never exposed
/// through the web layer.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "routers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_encrypted: String,
    /// Device-side profile name that means "blocked for non-payment".
    /// `None` until configured by the operator or auto-detected by a scan.
    pub isolation_profile: Option<String>,
    pub is_active: bool,
    pub cpu_load: Option<String>,
    pub uptime: Option<String>,
    pub version: Option<String>,
    pub board_name: Option<String>,
    pub online_count: Option<i32>,
    /// Customers mapped to this router at the last successful scan.
    pub customer_count: Option<i32>,
    /// Last successful scan.
    pub last_scan_at: Option<ChronoDateTimeUtc>,
    /// Last scan attempt, successful or not.
    pub last_checked_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::customer::Entity")]
    Customer,

    #[sea_orm(has_many = "super::package::Entity")]
    Package,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
