use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enforcement status of a customer account. Stored as text; the string
/// values are what the scan and the job runner write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "customer_status_enum")]
pub enum CustomerStatus {
    #[sea_orm(string_value = "active")]
    Active,
    /// Blocked for non-payment; the device-side secret sits on the router's
    /// isolation profile.
    #[sea_orm(string_value = "isolated")]
    Isolated,
    /// Suspended for a non-billing reason; reconciliation never touches it.
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "terminated")]
    Terminated,
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerStatus::Active => write!(f, "active"),
            CustomerStatus::Isolated => write!(f, "isolated"),
            CustomerStatus::Suspended => write!(f, "suspended"),
            CustomerStatus::Terminated => write!(f, "terminated"),
        }
    }
}
