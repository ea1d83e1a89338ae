use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::entities::router;
use crate::db::services;
use crate::routeros::{HealthSnapshot, SessionBudget};
use crate::sync::{SyncMode, SyncReport};
use crate::web::{AppError, AppState};

/// How long a live-status answer is served from cache before a new device
/// round trip is made.
pub const LIVE_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
pub struct LiveStatus {
    pub router_id: i32,
    pub online: bool,
    pub health: Option<HealthSnapshot>,
    pub error: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl LiveStatus {
    fn offline(router_id: i32, error: Option<String>) -> Self {
        Self {
            router_id,
            online: false,
            health: None,
            error,
            checked_at: chrono::Utc::now(),
        }
    }
}

/// Live device status with a short per-router cache so a dashboard refresh
/// burst costs one device session, not one per request. An inactive router
/// answers immediately without connecting.
async fn live_status_handler(
    State(state): State<Arc<AppState>>,
    Path(router_id): Path<i32>,
) -> Result<Json<LiveStatus>, AppError> {
    if let Some(entry) = state.live_cache.get(&router_id) {
        let (fetched_at, status) = entry.value();
        if fetched_at.elapsed() < LIVE_CACHE_TTL {
            return Ok(Json(status.clone()));
        }
    }

    let router = state
        .store
        .get_router(router_id)
        .await?
        .ok_or(AppError::NotFound("router"))?;

    let status = if !router.is_active {
        LiveStatus::offline(router_id, Some("router is marked inactive".to_string()))
    } else {
        match state
            .engine
            .sync_router(&router, SyncMode::HealthOnly, SessionBudget::INTERACTIVE)
            .await
        {
            Ok(report) => LiveStatus {
                router_id,
                online: true,
                health: report.health,
                error: None,
                checked_at: chrono::Utc::now(),
            },
            // Unreachable is a valid live answer; the engine has already
            // logged the failure and marked the router inactive.
            Err(e) => LiveStatus::offline(router_id, Some(e.to_string())),
        }
    };

    state
        .live_cache
        .insert(router_id, (Instant::now(), status.clone()));
    Ok(Json(status))
}

/// Full reconciliation on demand, bypassing the scheduler. Also the way an
/// operator brings a router marked inactive back into rotation.
async fn manual_sync_handler(
    State(state): State<Arc<AppState>>,
    Path(router_id): Path<i32>,
) -> Result<Json<SyncReport>, AppError> {
    let router = state
        .store
        .get_router(router_id)
        .await?
        .ok_or(AppError::NotFound("router"))?;

    let result = state
        .engine
        .sync_router(&router, SyncMode::Full, SessionBudget::DEFAULT)
        .await;
    state
        .audit
        .record_activity(
            "router.sync.manual",
            "router",
            Some(router_id),
            json!({ "outcome": if result.is_ok() { "succeeded" } else { "failed" } }),
        )
        .await;
    let report = result?;
    state.live_cache.remove(&router_id);
    Ok(Json(report))
}

#[derive(Deserialize)]
pub struct CreateRouterRequest {
    name: String,
    host: String,
    port: u16,
    username: String,
    password: String,
}

async fn list_routers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<router::Model>>, AppError> {
    Ok(Json(services::list_routers(&state.db).await?))
}

async fn create_router_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRouterRequest>,
) -> Result<(StatusCode, Json<router::Model>), AppError> {
    let model = services::create_router(
        &state.db,
        &payload.name,
        &payload.host,
        payload.port,
        &payload.username,
        &payload.password,
        &state.encryption_key,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(model)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_routers_handler))
        .route("/", post(create_router_handler))
        .route("/{id}/live", get(live_status_handler))
        .route("/{id}/sync", post(manual_sync_handler))
}
