//! Enforcement operations: the device-facing verbs the billing side uses.
//!
//! All of these require an already-open [`DeviceSession`] and propagate
//! connection/protocol failures to the caller. "The account does not exist
//! on the device" is a soft outcome (`Ok(false)`), not an error.

use serde::Serialize;
use tracing::{debug, warn};

use super::error::DeviceError;
use super::query::Query;
use super::record::DeviceRecord;
use super::session::DeviceSession;

pub const PPP_SECRET: &str = "/ppp/secret";
pub const PPP_ACTIVE: &str = "/ppp/active";
pub const PPP_PROFILE: &str = "/ppp/profile";
pub const SYSTEM_RESOURCE: &str = "/system/resource";

/// Profile a reconnected account falls back to when no package is known.
pub const DEFAULT_PROFILE: &str = "default";

/// All configured accounts on the device.
pub async fn list_secrets(session: &mut DeviceSession) -> Result<Vec<DeviceRecord>, DeviceError> {
    session.execute(&Query::print(PPP_SECRET)).await
}

/// Accounts with a currently connected session.
pub async fn list_active_sessions(
    session: &mut DeviceSession,
) -> Result<Vec<DeviceRecord>, DeviceError> {
    session.execute(&Query::print(PPP_ACTIVE)).await
}

/// All profiles configured on the device.
pub async fn list_profiles(session: &mut DeviceSession) -> Result<Vec<DeviceRecord>, DeviceError> {
    session.execute(&Query::print(PPP_PROFILE)).await
}

/// The `/system/resource` record (cpu load, uptime, version, board name).
pub async fn resource_info(session: &mut DeviceSession) -> Result<DeviceRecord, DeviceError> {
    let mut records = session.execute(&Query::print(SYSTEM_RESOURCE)).await?;
    records
        .drain(..)
        .next()
        .ok_or_else(|| DeviceError::Protocol("empty /system/resource reply".to_string()))
}

/// Moves the account's secret onto the isolation profile and kicks any live
/// session so the change bites immediately.
///
/// Returns `Ok(false)` when the device has no secret with that name; the
/// session kick is best-effort (the profile change alone degrades service on
/// the next reconnect), so a failure there is logged and swallowed.
pub async fn isolate(
    session: &mut DeviceSession,
    account: &str,
    isolation_profile: &str,
) -> Result<bool, DeviceError> {
    set_secret_profile(session, account, isolation_profile).await
}

/// Restores the account to `target_profile` (or [`DEFAULT_PROFILE`]) and
/// drops its live session so it comes back with the restored profile.
/// Same not-found convention as [`isolate`].
pub async fn reconnect(
    session: &mut DeviceSession,
    account: &str,
    target_profile: Option<&str>,
) -> Result<bool, DeviceError> {
    set_secret_profile(session, account, target_profile.unwrap_or(DEFAULT_PROFILE)).await
}

async fn set_secret_profile(
    session: &mut DeviceSession,
    account: &str,
    profile: &str,
) -> Result<bool, DeviceError> {
    let matches = session
        .execute(&Query::print(PPP_SECRET).filter("name", account))
        .await?;
    let Some(secret_id) = matches.first().and_then(|r| r.id()).map(str::to_string) else {
        debug!(account, "secret not found on device");
        return Ok(false);
    };

    session
        .execute(&Query::set(PPP_SECRET, &secret_id).attribute("profile", profile))
        .await?;

    if let Err(e) = drop_active_session(session, account).await {
        // A still-connected session keeps its old profile until the user
        // reconnects; the secret change already took effect.
        warn!(account, error = %e, "failed to drop active session after profile change");
    }
    Ok(true)
}

/// Removes every live session for `account`. Used by isolate/reconnect.
async fn drop_active_session(
    session: &mut DeviceSession,
    account: &str,
) -> Result<(), DeviceError> {
    let active = session
        .execute(&Query::print(PPP_ACTIVE).filter("name", account))
        .await?;
    for row in active {
        if let Some(id) = row.id() {
            session.execute(&Query::remove(PPP_ACTIVE, id)).await?;
            debug!(account, session_id = id, "dropped active session");
        }
    }
    Ok(())
}

/// Aggregated device health; the live-status endpoint serializes this as-is.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub cpu_load: Option<String>,
    pub uptime: Option<String>,
    pub version: Option<String>,
    pub board_name: Option<String>,
    pub online_count: i32,
    pub total_account_count: i32,
}

impl HealthSnapshot {
    pub fn from_resource(resource: &DeviceRecord) -> Self {
        Self {
            cpu_load: resource.get("cpu-load").map(str::to_string),
            uptime: resource.get("uptime").map(str::to_string),
            version: resource.get("version").map(str::to_string),
            board_name: resource.get("board-name").map(str::to_string),
            online_count: 0,
            total_account_count: 0,
        }
    }
}

/// Three queries rolled into one record: resource info, online session count,
/// configured account count. Any individual failure propagates.
pub async fn health_snapshot(session: &mut DeviceSession) -> Result<HealthSnapshot, DeviceError> {
    let resource = resource_info(session).await?;
    let online = list_active_sessions(session).await?.len() as i32;
    let total = list_secrets(session).await?.len() as i32;
    let mut snapshot = HealthSnapshot::from_resource(&resource);
    snapshot.online_count = online;
    snapshot.total_account_count = total;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routeros::session::SessionBudget;
    use crate::routeros::transport::DeviceEndpoint;
    use crate::testkit::{FakeConnector, FakeDevice};
    use std::sync::Arc;

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint {
            host: "10.0.0.1".to_string(),
            port: 8728,
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    async fn open(device: &Arc<FakeDevice>) -> DeviceSession {
        let connector = FakeConnector::new(Arc::clone(device));
        DeviceSession::open(&connector, &endpoint(), SessionBudget::DEFAULT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn isolate_moves_profile_and_kicks_session() {
        let device = Arc::new(FakeDevice::default());
        device.add_secret("budi", "10MB");
        device.add_active("budi");
        let mut session = open(&device).await;

        let applied = isolate(&mut session, "budi", "isolir").await.unwrap();
        assert!(applied);
        assert_eq!(device.secret_profile("budi").as_deref(), Some("isolir"));
        assert!(device.active_names().is_empty());
        session.close().await;
    }

    #[tokio::test]
    async fn isolate_unknown_account_is_not_an_error() {
        let device = Arc::new(FakeDevice::default());
        device.add_secret("siti", "20MB");
        let mut session = open(&device).await;

        let applied = isolate(&mut session, "budi", "isolir").await.unwrap();
        assert!(!applied);
        assert_eq!(device.secret_profile("siti").as_deref(), Some("20MB"));
        session.close().await;
    }

    #[tokio::test]
    async fn reconnect_defaults_to_default_profile() {
        let device = Arc::new(FakeDevice::default());
        device.add_secret("budi", "isolir");
        let mut session = open(&device).await;

        let applied = reconnect(&mut session, "budi", None).await.unwrap();
        assert!(applied);
        assert_eq!(device.secret_profile("budi").as_deref(), Some("default"));

        let applied = reconnect(&mut session, "budi", Some("10MB")).await.unwrap();
        assert!(applied);
        assert_eq!(device.secret_profile("budi").as_deref(), Some("10MB"));
        session.close().await;
    }

    #[tokio::test]
    async fn health_snapshot_aggregates_three_queries() {
        let device = Arc::new(FakeDevice::default());
        device.set_resource(&[
            ("cpu-load", "17"),
            ("uptime", "2w3d"),
            ("version", "7.15.2"),
            ("board-name", "hEX S"),
        ]);
        device.add_secret("budi", "10MB");
        device.add_secret("siti", "20MB");
        device.add_active("budi");
        let mut session = open(&device).await;

        let snapshot = health_snapshot(&mut session).await.unwrap();
        assert_eq!(snapshot.cpu_load.as_deref(), Some("17"));
        assert_eq!(snapshot.board_name.as_deref(), Some("hEX S"));
        assert_eq!(snapshot.online_count, 1);
        assert_eq!(snapshot.total_account_count, 2);
        session.close().await;
    }

    #[test]
    fn snapshot_tolerates_partial_resource_record() {
        let resource = crate::routeros::DeviceRecord::from_pairs(&[("uptime", "4d2h")]);
        let snapshot = HealthSnapshot::from_resource(&resource);
        assert_eq!(snapshot.uptime.as_deref(), Some("4d2h"));
        assert_eq!(snapshot.cpu_load, None);
        assert_eq!(snapshot.online_count, 0);
    }

    #[tokio::test]
    async fn operations_require_open_session() {
        let device = Arc::new(FakeDevice::default());
        let mut session = open(&device).await;
        session.close().await;

        let err = list_secrets(&mut session).await.unwrap_err();
        assert!(matches!(err, DeviceError::NotConnected));
    }
}
