use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::ports::{ReferenceLookup, ReferenceTable};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PostgresReferenceLookup {
    pool: PgPool,
}

impl PostgresReferenceLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceLookup for PostgresReferenceLookup {
    async fn exists(&self, table: ReferenceTable, server_id: i32, id: &str) -> Result<bool> {
        // Table names cannot be bound; both come from the closed enum.
        let sql = match table {
            ReferenceTable::Users => {
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND server_id = $2)"
            }
            ReferenceTable::Items => {
                "SELECT EXISTS(SELECT 1 FROM items WHERE id = $1 AND server_id = $2)"
            }
        };
        let exists: bool = sqlx::query_scalar(sql)
            .bind(id)
            .bind(server_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
