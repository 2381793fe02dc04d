use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use jfstats_core::api::types::{SweepResponse, SyncAcceptedResponse, SyncStatusResponse};
use jfstats_core::sync::SyncJob;
use tracing::info;

use super::servers::load_server;
use crate::AppState;
use crate::infra::errors::AppResult;

/// GET /api/v1/servers/{id}/sync/status
pub async fn sync_status_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<SyncStatusResponse>> {
    let server = load_server(&state, id).await?;
    Ok(Json(SyncStatusResponse::from(&server)))
}

/// POST /api/v1/servers/{id}/sync
pub async fn trigger_sync_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<SyncAcceptedResponse>)> {
    let server = load_server(&state, id).await?;
    let job = SyncJob::FullSync {
        server_id: server.id,
    };
    state.jobs.enqueue(job).await?;
    info!(server_id = server.id, "full sync requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAcceptedResponse {
            server_id: server.id,
            job: job.to_string(),
            queued: true,
        }),
    ))
}

/// POST /api/v1/servers/{id}/sync/reset
pub async fn reset_sync_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<SyncStatusResponse>> {
    let server = state.sweeper.force_reset(id, Utc::now()).await?;
    Ok(Json(SyncStatusResponse::from(&server)))
}

/// POST /api/v1/sync/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let reset_server_ids = state.sweeper.sweep(Utc::now()).await?;
    Ok(Json(SweepResponse { reset_server_ids }))
}
