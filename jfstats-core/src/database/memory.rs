//! In-process implementation of every repository port, used by tests and by
//! the server when it runs without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use jfstats_model::{
    ActivityRecord, ItemRecord, LibraryRecord, NewServer, ServerRecord, ServerSyncState, Session,
    SyncStatus, UserRecord,
};
use tokio::sync::RwLock;

use crate::database::ports::{
    CatalogRepository, ReferenceLookup, ReferenceTable, ServerRepository, SessionRepository,
};
use crate::error::{Result, StatsError};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    next_server_id: AtomicI32,
    servers: RwLock<BTreeMap<i32, ServerRecord>>,
    sessions: RwLock<HashMap<String, Session>>,
    users: RwLock<HashMap<String, UserRecord>>,
    libraries: RwLock<HashMap<String, LibraryRecord>>,
    items: RwLock<HashMap<String, ItemRecord>>,
    activities: RwLock<HashMap<String, ActivityRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a server row with an explicit sync state.
    pub async fn insert_server(&self, server: NewServer, sync: ServerSyncState) -> ServerRecord {
        let id = self.next_server_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = ServerRecord {
            id,
            name: server.name,
            url: server.url,
            api_key: server.api_key,
            sync,
        };
        self.servers.write().await.insert(id, record.clone());
        record
    }

    pub async fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        sessions
    }

    pub async fn users(&self) -> Vec<UserRecord> {
        self.users.read().await.values().cloned().collect()
    }

    pub async fn libraries(&self) -> Vec<LibraryRecord> {
        self.libraries.read().await.values().cloned().collect()
    }

    pub async fn items(&self) -> Vec<ItemRecord> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn activities(&self) -> Vec<ActivityRecord> {
        self.activities.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ServerRepository for InMemoryStore {
    async fn list_servers(&self) -> Result<Vec<ServerRecord>> {
        Ok(self.servers.read().await.values().cloned().collect())
    }

    async fn get_server(&self, id: i32) -> Result<Option<ServerRecord>> {
        Ok(self.servers.read().await.get(&id).cloned())
    }

    async fn create_server(&self, server: NewServer) -> Result<ServerRecord> {
        if self.servers.read().await.values().any(|s| s.url == server.url) {
            return Err(StatsError::Conflict(format!(
                "A server with URL {} already exists",
                server.url
            )));
        }
        Ok(self.insert_server(server, ServerSyncState::default()).await)
    }

    async fn update_sync_state(&self, id: i32, state: &ServerSyncState) -> Result<()> {
        let mut servers = self.servers.write().await;
        let server = servers
            .get_mut(&id)
            .ok_or_else(|| StatsError::NotFound(format!("server {id}")))?;
        server.sync = state.clone();
        Ok(())
    }

    async fn list_syncing(&self) -> Result<Vec<ServerRecord>> {
        Ok(self
            .servers
            .read()
            .await
            .values()
            .filter(|s| s.sync.sync_status == SyncStatus::Syncing)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn insert_session(&self, session: &Session) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Ok(false);
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(true)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn count_sessions(&self, server_id: i32) -> Result<u64> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.server_id == server_id)
            .count() as u64)
    }

    fn stream_sessions(&self, server_id: i32) -> BoxStream<'_, Result<Session>> {
        async_stream::stream! {
            let sessions = self.sessions().await;
            for session in sessions.into_iter().filter(|s| s.server_id == server_id) {
                yield Ok(session);
            }
        }
        .boxed()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn upsert_library(&self, library: &LibraryRecord) -> Result<()> {
        self.libraries
            .write()
            .await
            .insert(library.id.clone(), library.clone());
        Ok(())
    }

    async fn upsert_item(&self, item: &ItemRecord) -> Result<()> {
        self.items.write().await.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn upsert_activity(&self, activity: &ActivityRecord) -> Result<()> {
        self.activities
            .write()
            .await
            .insert(activity.id.clone(), activity.clone());
        Ok(())
    }
}

#[async_trait]
impl ReferenceLookup for InMemoryStore {
    async fn exists(&self, table: ReferenceTable, server_id: i32, id: &str) -> Result<bool> {
        Ok(match table {
            ReferenceTable::Users => self
                .users
                .read()
                .await
                .get(id)
                .is_some_and(|user| user.server_id == server_id),
            ReferenceTable::Items => self
                .items
                .read()
                .await
                .get(id)
                .is_some_and(|item| item.server_id == server_id),
        })
    }
}
