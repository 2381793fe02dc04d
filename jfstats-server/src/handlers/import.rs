use std::fmt::Display;
use std::io;

use axum::{
    Json,
    body::Body,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use jfstats_core::api::types::{ImportQuery, ImportResponse};
use jfstats_core::import::detect_tsv;
use jfstats_model::{ImportSummary, SourceFormat};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use super::servers::load_server;
use crate::AppState;
use crate::infra::errors::{AppError, AppResult};

/// Upload chunks buffered between the HTTP body and the parser.
const UPLOAD_CHUNK_BUFFER: usize = 8;

/// POST /api/v1/import/jellystats
pub async fn import_jellystats_handler(
    state: State<AppState>,
    query: Query<ImportQuery>,
    request: Request,
) -> AppResult<Json<ImportResponse>> {
    import_upload(state, query, SourceFormat::Jellystats, request).await
}

/// POST /api/v1/import/legacy
pub async fn import_legacy_handler(
    state: State<AppState>,
    query: Query<ImportQuery>,
    request: Request,
) -> AppResult<Json<ImportResponse>> {
    import_upload(state, query, SourceFormat::Legacy, request).await
}

/// POST /api/v1/import/playback-reporting
pub async fn import_playback_reporting_handler(
    state: State<AppState>,
    query: Query<ImportQuery>,
    request: Request,
) -> AppResult<Json<ImportResponse>> {
    import_upload(state, query, SourceFormat::PlaybackReporting, request).await
}

/// Accepts either a multipart form with a `file` field or the raw file as
/// the request body.
async fn import_upload(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    format: SourceFormat,
    request: Request,
) -> AppResult<Json<ImportResponse>> {
    let server = load_server(&state, query.server_id).await?;

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let summary = if content_type
        .as_deref()
        .is_some_and(|value| value.starts_with("multipart/form-data"))
    {
        let mut multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;
        let field = loop {
            match multipart
                .next_field()
                .await
                .map_err(|err| AppError::bad_request(err.body_text()))?
            {
                Some(field) if field.name() == Some("file") => break field,
                Some(_) => continue,
                None => {
                    return Err(AppError::bad_request(
                        "multipart upload has no `file` field",
                    ));
                }
            }
        };
        let tsv = detect_tsv(field.content_type(), field.file_name());
        info!(
            server_id = server.id,
            %format,
            file_name = field.file_name().unwrap_or("-"),
            tsv,
            "multipart import started"
        );
        run_import(&state, format, server.id, tsv, field).await?
    } else {
        let tsv = detect_tsv(content_type.as_deref(), None);
        info!(server_id = server.id, %format, tsv, "raw body import started");
        let body: Body = request.into_body();
        run_import(&state, format, server.id, tsv, body.into_data_stream()).await?
    };

    Ok(Json(ImportResponse::from_summary(format, &summary)))
}

/// Feeds `source` to the import pipeline through a small channel so the
/// borrowed multipart field and the `'static` reader can make progress
/// together in this task.
async fn run_import<S, E>(
    state: &AppState,
    format: SourceFormat,
    server_id: i32,
    tsv: bool,
    source: S,
) -> AppResult<ImportSummary>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(UPLOAD_CHUNK_BUFFER);
    let reader = StreamReader::new(ReceiverStream::new(rx));

    let pump = async move {
        let mut source = std::pin::pin!(source);
        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(|err| io::Error::other(err.to_string()));
            let failed = chunk.is_err();
            if let Err(err) = &chunk {
                warn!(error = %err, "upload interrupted");
            }
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    };

    let (_, summary) = tokio::join!(pump, state.importer.import(format, server_id, reader, tsv));
    Ok(summary?)
}
