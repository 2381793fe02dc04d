use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use jfstats_model::{PlayMethod, Session, StreamDescriptor};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::database::ports::SessionRepository;
use crate::error::{Result, StatsError};

const SESSION_COLUMNS: &str = r#"
    id, server_id, user_id, item_id, user_name, item_name, series_name, season_id,
    client_name, device_name, device_id, start_time, end_time, last_activity_date,
    play_duration, position_ticks, runtime_ticks, percent_complete, completed,
    is_paused, is_muted, is_active, play_method,
    video_codec, audio_codec, container, resolution_width, resolution_height, bitrate,
    transcode_video_codec, transcode_audio_codec, transcode_container,
    transcode_width, transcode_height, transcode_bitrate,
    is_transcoded, transcode_reasons, raw_data
"#;

#[derive(Debug, Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<Session> {
        let play_method: Option<String> = row.try_get("play_method")?;
        let raw_data: Option<Json<Value>> = row.try_get("raw_data")?;
        Ok(Session {
            id: row.try_get("id")?,
            server_id: row.try_get("server_id")?,
            user_id: row.try_get("user_id")?,
            item_id: row.try_get("item_id")?,
            user_name: row.try_get("user_name")?,
            item_name: row.try_get("item_name")?,
            series_name: row.try_get("series_name")?,
            season_id: row.try_get("season_id")?,
            client_name: row.try_get("client_name")?,
            device_name: row.try_get("device_name")?,
            device_id: row.try_get("device_id")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            last_activity_date: row.try_get("last_activity_date")?,
            play_duration: row.try_get("play_duration")?,
            position_ticks: row.try_get("position_ticks")?,
            runtime_ticks: row.try_get("runtime_ticks")?,
            percent_complete: row.try_get("percent_complete")?,
            completed: row.try_get("completed")?,
            is_paused: row.try_get("is_paused")?,
            is_muted: row.try_get("is_muted")?,
            is_active: row.try_get("is_active")?,
            play_method: play_method.as_deref().and_then(PlayMethod::from_label),
            source: StreamDescriptor {
                video_codec: row.try_get("video_codec")?,
                audio_codec: row.try_get("audio_codec")?,
                container: row.try_get("container")?,
                width: row.try_get("resolution_width")?,
                height: row.try_get("resolution_height")?,
                bitrate: row.try_get("bitrate")?,
            },
            transcode: StreamDescriptor {
                video_codec: row.try_get("transcode_video_codec")?,
                audio_codec: row.try_get("transcode_audio_codec")?,
                container: row.try_get("transcode_container")?,
                width: row.try_get("transcode_width")?,
                height: row.try_get("transcode_height")?,
                bitrate: row.try_get("transcode_bitrate")?,
            },
            is_transcoded: row.try_get("is_transcoded")?,
            transcode_reasons: row.try_get("transcode_reasons")?,
            raw_data: raw_data.map(|json| json.0).unwrap_or(Value::Null),
        })
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert_session(&self, session: &Session) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (
                id, server_id, user_id, item_id, user_name, item_name, series_name, season_id,
                client_name, device_name, device_id, start_time, end_time, last_activity_date,
                play_duration, position_ticks, runtime_ticks, percent_complete, completed,
                is_paused, is_muted, is_active, play_method,
                video_codec, audio_codec, container, resolution_width, resolution_height, bitrate,
                transcode_video_codec, transcode_audio_codec, transcode_container,
                transcode_width, transcode_height, transcode_bitrate,
                is_transcoded, transcode_reasons, raw_data
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19,
                $20, $21, $22, $23,
                $24, $25, $26, $27, $28, $29,
                $30, $31, $32,
                $33, $34, $35,
                $36, $37, $38
            )
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&session.id)
        .bind(session.server_id)
        .bind(session.user_id.as_deref())
        .bind(session.item_id.as_deref())
        .bind(&session.user_name)
        .bind(session.item_name.as_deref())
        .bind(session.series_name.as_deref())
        .bind(session.season_id.as_deref())
        .bind(session.client_name.as_deref())
        .bind(session.device_name.as_deref())
        .bind(session.device_id.as_deref())
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.last_activity_date)
        .bind(session.play_duration)
        .bind(session.position_ticks)
        .bind(session.runtime_ticks)
        .bind(session.percent_complete)
        .bind(session.completed)
        .bind(session.is_paused)
        .bind(session.is_muted)
        .bind(session.is_active)
        .bind(session.play_method.map(|m| m.as_str()))
        .bind(session.source.video_codec.as_deref())
        .bind(session.source.audio_codec.as_deref())
        .bind(session.source.container.as_deref())
        .bind(session.source.width)
        .bind(session.source.height)
        .bind(session.source.bitrate)
        .bind(session.transcode.video_codec.as_deref())
        .bind(session.transcode.audio_codec.as_deref())
        .bind(session.transcode.container.as_deref())
        .bind(session.transcode.width)
        .bind(session.transcode.height)
        .bind(session.transcode.bitrate)
        .bind(session.is_transcoded)
        .bind(session.transcode_reasons.as_deref())
        .bind(Json(&session.raw_data))
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    async fn count_sessions(&self, server_id: i32) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE server_id = $1")
            .bind(server_id)
            .fetch_one(self.pool())
            .await?;
        u64::try_from(count).map_err(|e| StatsError::Internal(format!("negative count: {e}")))
    }

    fn stream_sessions(&self, server_id: i32) -> BoxStream<'_, Result<Session>> {
        let pool = self.pool.clone();
        async_stream::try_stream! {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE server_id = $1 \
                 ORDER BY start_time NULLS LAST, id"
            );
            let mut rows = sqlx::query(&sql).bind(server_id).fetch(&pool);
            while let Some(row) = rows.next().await {
                let row = row?;
                yield Self::map_row(&row)?;
            }
        }
        .boxed()
    }
}
