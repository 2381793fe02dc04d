use async_trait::async_trait;
use jfstats_model::{ActivityRecord, ItemRecord, LibraryRecord, UserRecord};
use sqlx::PgPool;

use crate::database::ports::CatalogRepository;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, server_id, name, is_administrator, last_login_date, last_activity_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                server_id = EXCLUDED.server_id,
                name = EXCLUDED.name,
                is_administrator = EXCLUDED.is_administrator,
                last_login_date = EXCLUDED.last_login_date,
                last_activity_date = EXCLUDED.last_activity_date
            "#,
        )
        .bind(&user.id)
        .bind(user.server_id)
        .bind(&user.name)
        .bind(user.is_administrator)
        .bind(user.last_login_date)
        .bind(user.last_activity_date)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn upsert_library(&self, library: &LibraryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO libraries (id, server_id, name, type, locations)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                server_id = EXCLUDED.server_id,
                name = EXCLUDED.name,
                type = EXCLUDED.type,
                locations = EXCLUDED.locations
            "#,
        )
        .bind(&library.id)
        .bind(library.server_id)
        .bind(&library.name)
        .bind(library.collection_type.as_deref())
        .bind(&library.locations)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn upsert_item(&self, item: &ItemRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (
                id, server_id, name, type, parent_id, series_id, series_name, season_id,
                index_number, parent_index_number, runtime_ticks, production_year, date_created
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                server_id = EXCLUDED.server_id,
                name = EXCLUDED.name,
                type = EXCLUDED.type,
                parent_id = EXCLUDED.parent_id,
                series_id = EXCLUDED.series_id,
                series_name = EXCLUDED.series_name,
                season_id = EXCLUDED.season_id,
                index_number = EXCLUDED.index_number,
                parent_index_number = EXCLUDED.parent_index_number,
                runtime_ticks = EXCLUDED.runtime_ticks,
                production_year = EXCLUDED.production_year,
                date_created = EXCLUDED.date_created
            "#,
        )
        .bind(&item.id)
        .bind(item.server_id)
        .bind(&item.name)
        .bind(item.item_type.as_deref())
        .bind(item.parent_id.as_deref())
        .bind(item.series_id.as_deref())
        .bind(item.series_name.as_deref())
        .bind(item.season_id.as_deref())
        .bind(item.index_number)
        .bind(item.parent_index_number)
        .bind(item.runtime_ticks)
        .bind(item.production_year)
        .bind(item.date_created)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn upsert_activity(&self, activity: &ActivityRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, server_id, name, short_overview, type, item_id, user_id, date, severity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                short_overview = EXCLUDED.short_overview,
                type = EXCLUDED.type,
                item_id = EXCLUDED.item_id,
                user_id = EXCLUDED.user_id,
                date = EXCLUDED.date,
                severity = EXCLUDED.severity
            "#,
        )
        .bind(&activity.id)
        .bind(activity.server_id)
        .bind(&activity.name)
        .bind(activity.short_overview.as_deref())
        .bind(activity.activity_type.as_deref())
        .bind(activity.item_id.as_deref())
        .bind(activity.user_id.as_deref())
        .bind(activity.date)
        .bind(activity.severity.as_deref())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
