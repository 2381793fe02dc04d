pub mod catalog;
pub mod references;
pub mod servers;
pub mod sessions;

use std::fmt;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::{Result, StatsError};

pub use catalog::PostgresCatalogRepository;
pub use references::PostgresReferenceLookup;
pub use servers::PostgresServerRepository;
pub use sessions::PostgresSessionRepository;

/// Connection pool plus one adapter per repository port.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    servers: PostgresServerRepository,
    sessions: PostgresSessionRepository,
    catalog: PostgresCatalogRepository,
    references: PostgresReferenceLookup,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| StatsError::Internal(format!("Database connection failed: {e}")))?;

        info!(max_connections, "database pool initialized");
        Ok(Self::from_pool(pool, max_connections))
    }

    pub fn from_pool(pool: PgPool, max_connections: u32) -> Self {
        Self {
            servers: PostgresServerRepository::new(pool.clone()),
            sessions: PostgresSessionRepository::new(pool.clone()),
            catalog: PostgresCatalogRepository::new(pool.clone()),
            references: PostgresReferenceLookup::new(pool.clone()),
            pool,
            max_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn servers(&self) -> &PostgresServerRepository {
        &self.servers
    }

    pub fn sessions(&self) -> &PostgresSessionRepository {
        &self.sessions
    }

    pub fn catalog(&self) -> &PostgresCatalogRepository {
        &self.catalog
    }

    pub fn references(&self) -> &PostgresReferenceLookup {
        &self.references
    }

    /// Round-trip used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
