use async_trait::async_trait;
use futures::stream::BoxStream;
use jfstats_model::Session;

use crate::error::Result;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert-or-skip keyed by session id. Returns `false` when a row with the
    /// same id already existed.
    async fn insert_session(&self, session: &Session) -> Result<bool>;
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;
    async fn count_sessions(&self, server_id: i32) -> Result<u64>;
    /// All sessions of a server ordered by start time, without buffering.
    fn stream_sessions(&self, server_id: i32) -> BoxStream<'_, Result<Session>>;
}
