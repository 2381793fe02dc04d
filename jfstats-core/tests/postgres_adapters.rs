//! Postgres adapter behaviour. Needs `DATABASE_URL`; run with `--ignored`.

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use futures::TryStreamExt;
use jfstats_core::StatsError;
use jfstats_core::database::PostgresDatabase;
use jfstats_core::database::ports::{
    CatalogRepository, ReferenceLookup, ReferenceTable, ServerRepository, SessionRepository,
};
use jfstats_model::{
    ItemRecord, NewServer, PlayMethod, ServerSyncState, Session, SyncProgress, SyncStatus,
    UserRecord,
};
use serde_json::json;
use sqlx::PgPool;

fn new_server(url: &str) -> NewServer {
    NewServer {
        name: "Home".into(),
        url: url.into(),
        api_key: "secret".into(),
    }
}

#[sqlx::test(migrations = false, fixtures("schema"))]
#[ignore = "requires postgres"]
async fn server_rows_round_trip_sync_state(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool, 2);
    let servers = db.servers();

    let created = servers.create_server(new_server("http://jf.local")).await?;
    assert_eq!(created.sync.sync_status, SyncStatus::Pending);
    assert_eq!(created.sync.sync_progress, SyncProgress::NotStarted);

    let started = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let state = ServerSyncState {
        sync_status: SyncStatus::Syncing,
        sync_progress: SyncProgress::Items,
        sync_error: None,
        last_sync_started: Some(started),
        last_sync_completed: None,
    };
    servers.update_sync_state(created.id, &state).await?;

    let loaded = servers.get_server(created.id).await?.expect("server row");
    assert_eq!(loaded.sync, state);
    assert_eq!(servers.list_syncing().await?.len(), 1);

    let missing = servers.update_sync_state(9999, &state).await;
    assert!(matches!(missing, Err(StatsError::NotFound(_))));
    Ok(())
}

#[sqlx::test(migrations = false, fixtures("schema"))]
#[ignore = "requires postgres"]
async fn duplicate_server_url_is_a_conflict(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool, 2);
    db.servers().create_server(new_server("http://dup")).await?;
    let err = db
        .servers()
        .create_server(new_server("http://dup"))
        .await
        .expect_err("unique url");
    assert!(matches!(err, StatsError::Conflict(_)));
    Ok(())
}

#[sqlx::test(migrations = false, fixtures("schema"))]
#[ignore = "requires postgres"]
async fn session_insert_is_conflict_ignoring(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool, 2);
    let server = db.servers().create_server(new_server("http://s")).await?;

    let mut session = Session::new("sess-1", server.id);
    session.user_name = "alice".into();
    session.start_time = Some(Utc::now() - Duration::minutes(5));
    session.play_duration = 300;
    session.play_method = Some(PlayMethod::Transcode);
    session.is_transcoded = true;
    session.transcode_reasons = Some(vec!["ContainerNotSupported".into()]);
    session.raw_data = json!({ "Id": "sess-1" });

    assert!(db.sessions().insert_session(&session).await?);
    assert!(!db.sessions().insert_session(&session).await?);
    assert_eq!(db.sessions().count_sessions(server.id).await?, 1);

    let loaded = db.sessions().get_session("sess-1").await?.expect("row");
    assert_eq!(loaded.play_method, Some(PlayMethod::Transcode));
    assert_eq!(loaded.raw_data, json!({ "Id": "sess-1" }));

    let streamed: Vec<Session> = db.sessions().stream_sessions(server.id).try_collect().await?;
    assert_eq!(streamed.len(), 1);
    Ok(())
}

#[sqlx::test(migrations = false, fixtures("schema"))]
#[ignore = "requires postgres"]
async fn catalog_upserts_feed_reference_lookups(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool, 2);
    let server = db.servers().create_server(new_server("http://c")).await?;

    let mut user = UserRecord {
        id: "u1".into(),
        server_id: server.id,
        name: "alice".into(),
        is_administrator: false,
        last_login_date: None,
        last_activity_date: None,
    };
    db.catalog().upsert_user(&user).await?;
    user.name = "alice renamed".into();
    db.catalog().upsert_user(&user).await?;

    db.catalog()
        .upsert_item(&ItemRecord {
            id: "i1".into(),
            server_id: server.id,
            name: "Film".into(),
            item_type: Some("Movie".into()),
            parent_id: None,
            series_id: None,
            series_name: None,
            season_id: None,
            index_number: None,
            parent_index_number: None,
            runtime_ticks: Some(72_000_000_000),
            production_year: Some(1999),
            date_created: None,
        })
        .await?;

    let other = db.servers().create_server(new_server("http://c2")).await?;
    let lookup = db.references();
    assert!(lookup.exists(ReferenceTable::Users, server.id, "u1").await?);
    assert!(lookup.exists(ReferenceTable::Items, server.id, "i1").await?);
    assert!(!lookup.exists(ReferenceTable::Items, server.id, "gone").await?);
    assert!(!lookup.exists(ReferenceTable::Users, other.id, "u1").await?);
    assert!(!lookup.exists(ReferenceTable::Items, other.id, "i1").await?);
    Ok(())
}
