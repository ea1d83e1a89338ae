use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};

use crate::db::entities::activity_log;

// --- Activity Log Service Functions ---

/// Writes one structured audit entry. `properties` carries the free-form
/// detail bag (actor, outcome, error message).
pub async fn record_activity(
    db: &DatabaseConnection,
    action: &str,
    subject_type: &str,
    subject_id: Option<i32>,
    properties: serde_json::Value,
) -> Result<activity_log::Model, DbErr> {
    let entry = activity_log::ActiveModel {
        action: Set(action.to_owned()),
        subject_type: Set(subject_type.to_owned()),
        subject_id: Set(subject_id),
        properties: Set(Some(properties)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    entry.insert(db).await
}
