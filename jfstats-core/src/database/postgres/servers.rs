use async_trait::async_trait;
use jfstats_model::{NewServer, ServerRecord, ServerSyncState, SyncProgress, SyncStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::database::ports::ServerRepository;
use crate::error::{Result, StatsError};

const SERVER_COLUMNS: &str = "id, name, url, api_key, sync_status, sync_progress, sync_error, \
     last_sync_started, last_sync_completed";

#[derive(Debug, Clone)]
pub struct PostgresServerRepository {
    pool: PgPool,
}

impl PostgresServerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<ServerRecord> {
        let status: String = row.try_get("sync_status")?;
        let progress: String = row.try_get("sync_progress")?;
        Ok(ServerRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            api_key: row.try_get("api_key")?,
            sync: ServerSyncState {
                sync_status: status.parse::<SyncStatus>()?,
                sync_progress: progress.parse::<SyncProgress>()?,
                sync_error: row.try_get("sync_error")?,
                last_sync_started: row.try_get("last_sync_started")?,
                last_sync_completed: row.try_get("last_sync_completed")?,
            },
        })
    }
}

#[async_trait]
impl ServerRepository for PostgresServerRepository {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        let rows = sqlx::query(&format!("SELECT {SERVER_COLUMNS} FROM servers ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(Self::map_row).collect()
    }

    async fn get_server(&self, id: i32) -> Result<Option<ServerRecord>> {
        let row = sqlx::query(&format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    async fn create_server(&self, server: NewServer) -> Result<ServerRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO servers (name, url, api_key, sync_status, sync_progress) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SERVER_COLUMNS}"
        ))
        .bind(&server.name)
        .bind(&server.url)
        .bind(&server.api_key)
        .bind(SyncStatus::Pending.as_str())
        .bind(SyncProgress::NotStarted.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StatsError::Conflict(format!("A server with URL {} already exists", server.url))
            }
            other => StatsError::Database(other),
        })?;
        Self::map_row(&row)
    }

    async fn update_sync_state(&self, id: i32, state: &ServerSyncState) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE servers
            SET sync_status = $2,
                sync_progress = $3,
                sync_error = $4,
                last_sync_started = $5,
                last_sync_completed = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state.sync_status.as_str())
        .bind(state.sync_progress.as_str())
        .bind(state.sync_error.as_deref())
        .bind(state.last_sync_started)
        .bind(state.last_sync_completed)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StatsError::NotFound(format!("server {id}")));
        }
        Ok(())
    }

    async fn list_syncing(&self) -> Result<Vec<ServerRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers WHERE sync_status = $1 ORDER BY id"
        ))
        .bind(SyncStatus::Syncing.as_str())
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(Self::map_row).collect()
    }
}
