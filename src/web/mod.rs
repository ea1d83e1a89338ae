//! Thin HTTP surface: live router status, manual sync, and enforcement
//! job submission. Everything heavier runs in the scheduler loops.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;

use crate::jobs::JobQueue;
use crate::sync::SyncEngine;
use crate::sync::store::{ActivitySink, BillingStore};

pub mod error;
pub mod routes;

pub use error::AppError;

use routes::router_routes::LiveStatus;

pub struct AppState {
    /// Direct connection for the admin CRUD handlers; everything the
    /// reconciliation core touches goes through the `store` seam instead.
    pub db: DatabaseConnection,
    pub encryption_key: String,
    pub store: Arc<dyn BillingStore>,
    pub audit: Arc<dyn ActivitySink>,
    pub engine: Arc<SyncEngine>,
    pub queue: Arc<JobQueue>,
    /// Live-status responses by router id, reused within the cache window.
    pub live_cache: DashMap<i32, (Instant, LiveStatus)>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/routers", routes::router_routes::router())
        .nest("/api/customers", routes::customer_routes::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
