use async_trait::async_trait;
use jfstats_model::{ActivityRecord, ItemRecord, LibraryRecord, UserRecord};

use crate::error::Result;

/// Writes for the Jellyfin mirror tables, used by the sync phases.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn upsert_user(&self, user: &UserRecord) -> Result<()>;
    async fn upsert_library(&self, library: &LibraryRecord) -> Result<()>;
    async fn upsert_item(&self, item: &ItemRecord) -> Result<()>;
    async fn upsert_activity(&self, activity: &ActivityRecord) -> Result<()>;
}
