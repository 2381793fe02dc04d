use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use chrono::Utc;
use jfstats_core::export::{ExportInfo, ExportWriter, export_filename};
use tracing::info;

use super::servers::load_server;
use crate::AppState;
use crate::infra::errors::{AppError, AppResult};

/// GET /api/v1/servers/{id}/export
///
/// Sessions are streamed straight from the repository; the document is
/// never held in memory.
pub async fn export_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    let server = load_server(&state, id).await?;
    let now = Utc::now();
    let filename = export_filename(&server.name, now.date_naive());

    let writer = ExportWriter::new(state.unit_of_work.sessions.clone());
    let stream = writer.stream(ExportInfo::new(&server, now));
    info!(server_id = server.id, %filename, "export started");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|err| AppError::internal(format!("failed to build export response: {err}")))
}
