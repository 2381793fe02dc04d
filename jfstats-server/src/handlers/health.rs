use axum::{Json, extract::State};
use jfstats_core::api::types::HealthResponse;
use tracing::warn;

use crate::AppState;

/// GET /api/v1/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.postgres {
        Some(postgres) => match postgres.ping().await {
            Ok(()) => "connected",
            Err(err) => {
                warn!(error = %err, "health check could not reach the database");
                "unreachable"
            }
        },
        None => "in-memory",
    };

    Json(HealthResponse {
        status: if database == "unreachable" { "degraded" } else { "ok" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    })
}
