use std::sync::Arc;

use chrono::Utc;
use jfstats_model::{ServerSyncState, SyncProgress};
use tracing::{info, warn};

use crate::database::ports::ServerRepository;
use crate::error::Result;

use super::state::SyncTransitions;

/// Applies sync transitions to one server and writes each one through.
pub struct SyncStatusTracker {
    servers: Arc<dyn ServerRepository>,
    server_id: i32,
    state: ServerSyncState,
}

impl std::fmt::Debug for SyncStatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStatusTracker")
            .field("server_id", &self.server_id)
            .field("state", &self.state)
            .finish()
    }
}

impl SyncStatusTracker {
    pub fn new(servers: Arc<dyn ServerRepository>, server_id: i32, state: ServerSyncState) -> Self {
        Self {
            servers,
            server_id,
            state,
        }
    }

    pub fn state(&self) -> &ServerSyncState {
        &self.state
    }

    async fn persist(&self) -> Result<()> {
        self.servers
            .update_sync_state(self.server_id, &self.state)
            .await
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.state.begin(Utc::now());
        info!(server_id = self.server_id, "sync started");
        self.persist().await
    }

    pub async fn enter_phase(&mut self, phase: SyncProgress) -> Result<()> {
        self.state.enter_phase(phase)?;
        info!(server_id = self.server_id, %phase, "sync phase");
        self.persist().await
    }

    pub async fn complete(&mut self, warnings: &[String]) -> Result<()> {
        self.state.complete(Utc::now(), warnings);
        if warnings.is_empty() {
            info!(server_id = self.server_id, "sync completed");
        } else {
            warn!(
                server_id = self.server_id,
                warnings = warnings.len(),
                "sync completed with warnings"
            );
        }
        self.persist().await
    }

    pub async fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.state.fail(message);
        warn!(
            server_id = self.server_id,
            phase = %self.state.sync_progress,
            error = self.state.sync_error.as_deref().unwrap_or_default(),
            "sync failed"
        );
        self.persist().await
    }
}
