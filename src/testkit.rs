//! Shared test doubles: an in-memory billing store and a scripted fake
//! device that speaks reply sentences the way a real router would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::entities::{customer, package, router};
use crate::db::enums::CustomerStatus;
use crate::routeros::proto::{ReplyKind, ReplySentence};
use crate::routeros::transport::{DeviceEndpoint, DeviceTransport, TransportConnector};
use crate::routeros::{DeviceError, HealthSnapshot};
use crate::services::encryption_service;
use crate::sync::store::{ActivitySink, BillingStore, CustomerSyncUpdate, StoreError};

pub const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub fn router_model(id: i32, isolation_profile: Option<&str>) -> router::Model {
    let now = Utc::now();
    router::Model {
        id,
        name: format!("router-{id}"),
        host: "10.0.0.1".to_string(),
        port: 8728,
        username: "admin".to_string(),
        password_encrypted: encryption_service::encrypt("secret", TEST_KEY).unwrap(),
        isolation_profile: isolation_profile.map(str::to_string),
        is_active: true,
        cpu_load: None,
        uptime: None,
        version: None,
        board_name: None,
        online_count: None,
        customer_count: None,
        last_scan_at: None,
        last_checked_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn customer_model(
    id: i32,
    device_account: &str,
    router_id: Option<i32>,
    package_id: Option<i32>,
    status: CustomerStatus,
) -> customer::Model {
    let now = Utc::now();
    customer::Model {
        id,
        name: device_account.to_string(),
        device_account: device_account.to_string(),
        router_id,
        package_id,
        status,
        created_at: now,
        updated_at: now,
    }
}

pub fn package_model(id: i32, name: &str, profile: &str, router_id: Option<i32>) -> package::Model {
    let now = Utc::now();
    package::Model {
        id,
        name: name.to_string(),
        profile: profile.to_string(),
        router_id,
        created_at: now,
        updated_at: now,
    }
}

// --- In-memory store ---

#[derive(Default)]
pub struct MemStore {
    routers: Mutex<HashMap<i32, router::Model>>,
    customers: Mutex<HashMap<i32, customer::Model>>,
    packages: Mutex<Vec<package::Model>>,
    activities: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MemStore {
    pub fn insert_router(&self, model: router::Model) {
        self.routers.lock().unwrap().insert(model.id, model);
    }

    pub fn insert_customer(&self, model: customer::Model) {
        self.customers.lock().unwrap().insert(model.id, model);
    }

    pub fn insert_package(&self, model: package::Model) {
        self.packages.lock().unwrap().push(model);
    }

    pub fn router(&self, id: i32) -> router::Model {
        self.routers.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn customer(&self, id: i32) -> customer::Model {
        self.customers.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.lock().unwrap().len()
    }

    /// Full-store snapshot for byte-identical before/after comparisons.
    pub fn snapshot(&self) -> (Vec<router::Model>, Vec<customer::Model>, Vec<package::Model>) {
        let mut routers: Vec<_> = self.routers.lock().unwrap().values().cloned().collect();
        routers.sort_by_key(|r| r.id);
        let mut customers: Vec<_> = self.customers.lock().unwrap().values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        (routers, customers, self.packages.lock().unwrap().clone())
    }

    pub fn activity_count(&self, action: &str) -> usize {
        self.activities
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == action)
            .count()
    }
}

#[async_trait]
impl BillingStore for MemStore {
    async fn get_router(&self, router_id: i32) -> Result<Option<router::Model>, StoreError> {
        Ok(self.routers.lock().unwrap().get(&router_id).cloned())
    }

    async fn list_active_routers(&self) -> Result<Vec<router::Model>, StoreError> {
        let mut routers: Vec<_> = self
            .routers
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        routers.sort_by_key(|r| r.id);
        Ok(routers)
    }

    async fn get_customer(
        &self,
        customer_id: i32,
    ) -> Result<Option<customer::Model>, StoreError> {
        Ok(self.customers.lock().unwrap().get(&customer_id).cloned())
    }

    async fn find_customer_by_device_account(
        &self,
        account: &str,
    ) -> Result<Option<customer::Model>, StoreError> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .values()
            .find(|c| c.device_account == account)
            .cloned())
    }

    async fn get_package(&self, package_id: i32) -> Result<Option<package::Model>, StoreError> {
        Ok(self
            .packages
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == package_id)
            .cloned())
    }

    async fn find_package_for_profile(
        &self,
        profile: &str,
        router_id: i32,
    ) -> Result<Option<package::Model>, StoreError> {
        let packages = self.packages.lock().unwrap();
        let scoped = packages
            .iter()
            .find(|p| p.profile == profile && p.router_id == Some(router_id));
        Ok(scoped
            .or_else(|| {
                packages
                    .iter()
                    .find(|p| p.profile == profile && p.router_id.is_none())
            })
            .cloned())
    }

    async fn apply_customer_update(&self, update: &CustomerSyncUpdate) -> Result<(), StoreError> {
        let mut customers = self.customers.lock().unwrap();
        let model = customers.get_mut(&update.customer_id).unwrap();
        model.router_id = Some(update.router_id);
        if let Some(package_id) = update.package_id {
            model.package_id = Some(package_id);
        }
        if let Some(status) = update.status {
            model.status = status;
        }
        model.updated_at = Utc::now();
        Ok(())
    }

    async fn set_customer_status(
        &self,
        customer_id: i32,
        status: CustomerStatus,
    ) -> Result<(), StoreError> {
        let mut customers = self.customers.lock().unwrap();
        let model = customers.get_mut(&customer_id).unwrap();
        model.status = status;
        model.updated_at = Utc::now();
        Ok(())
    }

    async fn set_isolation_profile(
        &self,
        router_id: i32,
        profile: &str,
    ) -> Result<(), StoreError> {
        let mut routers = self.routers.lock().unwrap();
        let model = routers.get_mut(&router_id).unwrap();
        if model.isolation_profile.is_none() {
            model.isolation_profile = Some(profile.to_string());
        }
        Ok(())
    }

    async fn record_scan_success(
        &self,
        router_id: i32,
        health: Option<&HealthSnapshot>,
        customer_count: Option<i32>,
    ) -> Result<(), StoreError> {
        let mut routers = self.routers.lock().unwrap();
        let model = routers.get_mut(&router_id).unwrap();
        let now = Utc::now();
        model.is_active = true;
        model.last_scan_at = Some(now);
        model.last_checked_at = Some(now);
        if let Some(h) = health {
            model.cpu_load = h.cpu_load.clone();
            model.uptime = h.uptime.clone();
            model.version = h.version.clone();
            model.board_name = h.board_name.clone();
            model.online_count = Some(h.online_count);
        }
        if let Some(count) = customer_count {
            model.customer_count = Some(count);
        }
        Ok(())
    }

    async fn mark_router_inactive(&self, router_id: i32) -> Result<(), StoreError> {
        let mut routers = self.routers.lock().unwrap();
        let model = routers.get_mut(&router_id).unwrap();
        model.is_active = false;
        model.last_checked_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl ActivitySink for MemStore {
    async fn record_activity(
        &self,
        action: &str,
        _subject_type: &str,
        _subject_id: Option<i32>,
        properties: serde_json::Value,
    ) {
        self.activities
            .lock()
            .unwrap()
            .push((action.to_string(), properties));
    }
}

// --- Fake device ---

struct FakeRow {
    id: String,
    name: String,
    profile: Option<String>,
}

/// Scripted device state shared by a [`FakeConnector`] and the transports it
/// hands out. Behaves like a router with PPP secrets, active sessions,
/// profiles and a `/system/resource` record.
#[derive(Default)]
pub struct FakeDevice {
    secrets: Mutex<Vec<FakeRow>>,
    active: Mutex<Vec<FakeRow>>,
    profiles: Mutex<Vec<String>>,
    resource: Mutex<Vec<(String, String)>>,
    next_id: AtomicU32,
    /// Remaining connect attempts that should fail.
    pub connect_failures: AtomicU32,
    /// When non-zero, talks after this many successful ones fail with a
    /// connection error.
    pub fail_talks_after: AtomicU32,
    pub talks: AtomicU32,
    pub closes: AtomicU32,
}

impl FakeDevice {
    fn fresh_id(&self) -> String {
        format!("*{:X}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn add_secret(&self, name: &str, profile: &str) {
        self.secrets.lock().unwrap().push(FakeRow {
            id: self.fresh_id(),
            name: name.to_string(),
            profile: Some(profile.to_string()),
        });
    }

    pub fn add_active(&self, name: &str) {
        self.active.lock().unwrap().push(FakeRow {
            id: self.fresh_id(),
            name: name.to_string(),
            profile: None,
        });
    }

    pub fn set_profiles(&self, names: &[&str]) {
        *self.profiles.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
    }

    pub fn set_resource(&self, fields: &[(&str, &str)]) {
        *self.resource.lock().unwrap() = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    pub fn secret_profile(&self, name: &str) -> Option<String> {
        self.secrets
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.profile.clone())
    }

    pub fn active_names(&self) -> Vec<String> {
        self.active
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    fn handle(&self, words: &[String]) -> Result<Vec<ReplySentence>, DeviceError> {
        let talks = self.talks.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_after = self.fail_talks_after.load(Ordering::SeqCst);
        if fail_after > 0 && talks > fail_after {
            return Err(DeviceError::Connection("connection reset by peer".to_string()));
        }

        let command = words.first().map(String::as_str).unwrap_or("");
        let attributes: HashMap<String, String> = words
            .iter()
            .filter_map(|w| crate::routeros::proto::parse_attribute(w))
            .collect();
        let filters: HashMap<String, String> = words
            .iter()
            .filter_map(|w| {
                let rest = w.strip_prefix('?')?;
                let (k, v) = rest.split_once('=')?;
                Some((k.to_string(), v.to_string()))
            })
            .collect();

        let mut replies = Vec::new();
        match command {
            "/ppp/secret/print" => {
                for row in self.secrets.lock().unwrap().iter() {
                    if let Some(name) = filters.get("name") {
                        if &row.name != name {
                            continue;
                        }
                    }
                    let mut attrs = vec![
                        (".id".to_string(), row.id.clone()),
                        ("name".to_string(), row.name.clone()),
                    ];
                    if let Some(profile) = &row.profile {
                        attrs.push(("profile".to_string(), profile.clone()));
                    }
                    replies.push(re(attrs));
                }
            }
            "/ppp/secret/set" => {
                let id = attributes.get(".id").cloned().unwrap_or_default();
                let mut secrets = self.secrets.lock().unwrap();
                match secrets.iter_mut().find(|s| s.id == id) {
                    Some(row) => {
                        if let Some(profile) = attributes.get("profile") {
                            row.profile = Some(profile.clone());
                        }
                    }
                    None => replies.push(trap("no such item")),
                }
            }
            "/ppp/active/print" => {
                for row in self.active.lock().unwrap().iter() {
                    if let Some(name) = filters.get("name") {
                        if &row.name != name {
                            continue;
                        }
                    }
                    replies.push(re(vec![
                        (".id".to_string(), row.id.clone()),
                        ("name".to_string(), row.name.clone()),
                    ]));
                }
            }
            "/ppp/active/remove" => {
                let id = attributes.get(".id").cloned().unwrap_or_default();
                let mut active = self.active.lock().unwrap();
                let before = active.len();
                active.retain(|row| row.id != id);
                if active.len() == before {
                    replies.push(trap("no such item"));
                }
            }
            "/ppp/profile/print" => {
                for (i, name) in self.profiles.lock().unwrap().iter().enumerate() {
                    replies.push(re(vec![
                        (".id".to_string(), format!("*{i}")),
                        ("name".to_string(), name.clone()),
                    ]));
                }
            }
            "/system/resource/print" => {
                let resource = self.resource.lock().unwrap();
                if !resource.is_empty() {
                    replies.push(re(resource.clone()));
                }
            }
            other => replies.push(trap(&format!("no such command prefix {other}"))),
        }
        replies.push(ReplySentence {
            kind: ReplyKind::Done,
            attributes: Vec::new(),
        });
        Ok(replies)
    }
}

fn re(attributes: Vec<(String, String)>) -> ReplySentence {
    ReplySentence {
        kind: ReplyKind::Re,
        attributes,
    }
}

fn trap(message: &str) -> ReplySentence {
    ReplySentence {
        kind: ReplyKind::Trap,
        attributes: vec![("message".to_string(), message.to_string())],
    }
}

pub struct FakeTransport {
    device: Arc<FakeDevice>,
}

#[async_trait]
impl DeviceTransport for FakeTransport {
    async fn talk(&mut self, words: &[String]) -> Result<Vec<ReplySentence>, DeviceError> {
        self.device.handle(words)
    }

    async fn close(&mut self) {
        self.device.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    device: Arc<FakeDevice>,
}

impl FakeConnector {
    pub fn new(device: Arc<FakeDevice>) -> Self {
        Self { device }
    }
}

#[async_trait]
impl TransportConnector for FakeConnector {
    async fn connect(
        &self,
        _endpoint: &DeviceEndpoint,
        _timeout: Duration,
    ) -> Result<Box<dyn DeviceTransport>, DeviceError> {
        if self.device.connect_failures.load(Ordering::SeqCst) > 0 {
            self.device.connect_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(DeviceError::Connection("connection refused".to_string()));
        }
        Ok(Box::new(FakeTransport {
            device: Arc::clone(&self.device),
        }))
    }
}
