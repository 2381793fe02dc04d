//! Recovery for servers left in `syncing` by a worker that died mid-run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jfstats_model::{ServerRecord, SyncStatus};
use tracing::{info, warn};

use crate::database::ports::ServerRepository;
use crate::error::{Result, StatsError};

use super::state::SyncTransitions;

pub const DEFAULT_STUCK_THRESHOLD: Duration = Duration::from_secs(60 * 60);

pub struct StuckSyncSweeper {
    servers: Arc<dyn ServerRepository>,
    threshold: Duration,
}

impl std::fmt::Debug for StuckSyncSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StuckSyncSweeper")
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl StuckSyncSweeper {
    pub fn new(servers: Arc<dyn ServerRepository>, threshold: Duration) -> Self {
        Self { servers, threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    fn is_stuck(&self, server: &ServerRecord, now: DateTime<Utc>) -> bool {
        if server.sync.sync_status != SyncStatus::Syncing {
            return false;
        }
        let Some(started) = server.sync.last_sync_started else {
            return true;
        };
        let threshold = chrono::Duration::from_std(self.threshold).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(started) > threshold
    }

    /// Force-resets every server stuck in `syncing` past the threshold and
    /// returns their ids.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<i32>> {
        let mut reset = Vec::new();
        for mut server in self.servers.list_syncing().await? {
            if !self.is_stuck(&server, now) {
                continue;
            }
            let reason = format!(
                "Sync was stuck in progress for more than {} and was reset automatically",
                humanize(self.threshold)
            );
            server.sync.force_reset(now, reason);
            match self.servers.update_sync_state(server.id, &server.sync).await {
                Ok(()) => {
                    warn!(server_id = server.id, "reset stuck sync");
                    reset.push(server.id);
                }
                Err(err) => {
                    warn!(server_id = server.id, error = %err, "failed to reset stuck sync");
                }
            }
        }
        if !reset.is_empty() {
            info!(count = reset.len(), "stuck sync sweep finished");
        }
        Ok(reset)
    }

    /// Manual reset of one server regardless of how long it has been syncing.
    pub async fn force_reset(&self, server_id: i32, now: DateTime<Utc>) -> Result<ServerRecord> {
        let mut server = self
            .servers
            .get_server(server_id)
            .await?
            .ok_or_else(|| StatsError::NotFound(format!("server {server_id}")))?;
        server
            .sync
            .force_reset(now, "Sync status was manually reset after being stuck");
        self.servers.update_sync_state(server.id, &server.sync).await?;
        info!(server_id, "sync status manually reset");
        Ok(server)
    }
}

fn humanize(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    match minutes {
        0 => format!("{} seconds", duration.as_secs()),
        m if m % 60 == 0 && m >= 60 => {
            let hours = m / 60;
            format!("{hours} hour{}", if hours == 1 { "" } else { "s" })
        }
        m => format!("{m} minute{}", if m == 1 { "" } else { "s" }),
    }
}
