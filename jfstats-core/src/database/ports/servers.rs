use async_trait::async_trait;
use jfstats_model::{NewServer, ServerRecord, ServerSyncState};

use crate::error::Result;

#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>>;
    async fn get_server(&self, id: i32) -> Result<Option<ServerRecord>>;
    async fn create_server(&self, server: NewServer) -> Result<ServerRecord>;
    /// Overwrites the sync columns. Last writer wins.
    async fn update_sync_state(&self, id: i32, state: &ServerSyncState) -> Result<()>;
    async fn list_syncing(&self) -> Result<Vec<ServerRecord>>;
}
