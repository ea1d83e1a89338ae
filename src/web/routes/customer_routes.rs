use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use crate::jobs::{EnforcementAction, EnforcementJob};
use crate::web::{AppError, AppState};

#[derive(Serialize)]
struct EnqueuedResponse {
    job_id: Uuid,
    customer_id: i32,
    action: &'static str,
}

/// Queues the action; the scheduler's drain loop applies it with retries.
async fn enqueue(
    state: &AppState,
    customer_id: i32,
    action: EnforcementAction,
) -> Result<(StatusCode, Json<EnqueuedResponse>), AppError> {
    state
        .store
        .get_customer(customer_id)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    let job = EnforcementJob::new(customer_id, action);
    let response = EnqueuedResponse {
        job_id: job.id,
        customer_id,
        action: action.as_str(),
    };
    state.queue.enqueue(job);
    Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn isolate_handler(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i32>,
) -> Result<(StatusCode, Json<EnqueuedResponse>), AppError> {
    enqueue(&state, customer_id, EnforcementAction::Isolate).await
}

async fn reconnect_handler(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i32>,
) -> Result<(StatusCode, Json<EnqueuedResponse>), AppError> {
    enqueue(&state, customer_id, EnforcementAction::Reconnect).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}/isolate", post(isolate_handler))
        .route("/{id}/reconnect", post(reconnect_handler))
}
