use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use jfstats_core::api::routes::v1;
use tower_http::limit::RequestBodyLimitLayer;

use crate::AppState;
use crate::handlers::{export, health, import, servers, sync};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::HEALTH, get(health::health_handler))
        .merge(create_server_routes())
        .merge(create_sync_routes())
        .merge(create_import_routes(state.max_upload_bytes))
}

fn create_server_routes() -> Router<AppState> {
    Router::new()
        .route(
            v1::servers::COLLECTION,
            get(servers::list_servers_handler).post(servers::create_server_handler),
        )
        .route(
            v1::servers::ACTIVE_SESSIONS,
            get(servers::active_sessions_handler),
        )
        .route(v1::servers::EXPORT, get(export::export_handler))
}

fn create_sync_routes() -> Router<AppState> {
    Router::new()
        .route(v1::servers::SYNC, post(sync::trigger_sync_handler))
        .route(v1::servers::SYNC_STATUS, get(sync::sync_status_handler))
        .route(v1::servers::SYNC_RESET, post(sync::reset_sync_handler))
        .route(v1::sync::SWEEP, post(sync::sweep_handler))
}

/// Uploads bypass the default 2 MiB extractor limit and are capped by
/// `max_upload_bytes` instead.
fn create_import_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(v1::import::JELLYSTATS, post(import::import_jellystats_handler))
        .route(v1::import::LEGACY, post(import::import_legacy_handler))
        .route(
            v1::import::PLAYBACK_REPORTING,
            post(import::import_playback_reporting_handler),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
