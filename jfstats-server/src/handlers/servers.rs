use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use jfstats_core::api::types::{ActiveSessionsResponse, CreateServerRequest};
use jfstats_core::mapping::LiveSessionView;
use jfstats_model::ServerRecord;
use tracing::info;

use crate::AppState;
use crate::infra::errors::{AppError, AppResult};

pub(crate) async fn load_server(state: &AppState, id: i32) -> AppResult<ServerRecord> {
    state
        .unit_of_work
        .servers
        .get_server(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Server {id} not found")))
}

/// GET /api/v1/servers
pub async fn list_servers_handler(State(state): State<AppState>) -> AppResult<Json<Vec<ServerRecord>>> {
    Ok(Json(state.unit_of_work.servers.list_servers().await?))
}

/// POST /api/v1/servers
///
/// The API key is checked against `/System/Info` before anything is stored.
pub async fn create_server_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateServerRequest>,
) -> AppResult<(StatusCode, Json<ServerRecord>)> {
    if request.url.trim().is_empty() {
        return Err(AppError::bad_request("Server URL is required"));
    }
    if request.api_key.trim().is_empty() {
        return Err(AppError::bad_request("API key is required"));
    }

    let api = state.connector.connect(request.url.trim(), request.api_key.trim())?;
    let info = api.get_system_info().await?;

    let server = state
        .unit_of_work
        .servers
        .create_server(request.into_new_server(info.server_name))
        .await?;
    info!(server_id = server.id, name = %server.name, "server registered");
    Ok((StatusCode::CREATED, Json(server)))
}

/// GET /api/v1/servers/{id}/sessions/active
pub async fn active_sessions_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ActiveSessionsResponse>> {
    let server = load_server(&state, id).await?;
    let api = state.connector.connect(&server.url, &server.api_key)?;
    let sessions = api
        .get_sessions()
        .await?
        .iter()
        .filter_map(|record| LiveSessionView::from_record(record, server.id))
        .collect();

    Ok(Json(ActiveSessionsResponse {
        server_id: server.id,
        sessions,
    }))
}
