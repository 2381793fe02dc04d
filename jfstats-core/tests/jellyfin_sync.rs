//! Sync worker against a stub Jellyfin server bound to a local port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use futures::stream::BoxStream;
use jfstats_core::StatsError;
use jfstats_core::application::AppUnitOfWork;
use jfstats_core::database::InMemoryStore;
use jfstats_core::database::ports::{ServerRepository, SessionRepository};
use jfstats_core::providers::{
    HttpJellyfinConnector, JellyfinApi, JellyfinClient, JellyfinClientConfig, ProviderError,
};
use jfstats_core::sync::{LiveSessionTracker, SyncSettings, SyncWorker};
use jfstats_model::{NewServer, ServerSyncState, Session, SyncProgress, SyncStatus};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

const API_KEY: &str = "stub-key";

#[derive(Clone, Default)]
struct StubState {
    sessions: Arc<Mutex<Vec<Value>>>,
    unavailable: Arc<Mutex<bool>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("X-Emby-Token")
        .and_then(|value| value.to_str().ok())
        == Some(API_KEY)
}

async fn guard(state: &StubState, headers: &HeaderMap) -> Result<(), StatusCode> {
    if *state.unavailable.lock().await {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    if !authorized(headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

async fn system_info(
    State(state): State<StubState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    guard(&state, &headers).await?;
    Ok(Json(json!({ "ServerName": "Stub", "Version": "10.9.0", "Id": "stub" })))
}

async fn users(
    State(state): State<StubState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    guard(&state, &headers).await?;
    Ok(Json(json!([
        { "Id": "u1", "Name": "alice", "Policy": { "IsAdministrator": true } },
        { "Id": "u2", "Name": "bob" },
        { "Name": "no id" }
    ])))
}

async fn libraries(
    State(state): State<StubState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    guard(&state, &headers).await?;
    Ok(Json(json!([
        { "Name": "Movies", "CollectionType": "movies", "ItemId": "lib1", "Locations": ["/media/movies"] }
    ])))
}

fn catalog() -> Vec<Value> {
    vec![
        json!({ "Id": "i1", "Name": "Film", "Type": "Movie" }),
        json!({ "Id": "i2", "Name": "Pilot", "Type": "Episode", "SeriesName": "Show" }),
        json!({ "Id": "i3", "Name": "Song", "Type": "Audio" }),
    ]
}

fn page(all: Vec<Value>, params: &HashMap<String, String>) -> Value {
    let start: usize = params.get("StartIndex").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("Limit").and_then(|v| v.parse().ok()).unwrap_or(all.len());
    let total = all.len();
    let items: Vec<Value> = all.into_iter().skip(start).take(limit).collect();
    json!({ "Items": items, "TotalRecordCount": total })
}

async fn items(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    guard(&state, &headers).await?;
    Ok(Json(page(catalog(), &params)))
}

async fn activity(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    guard(&state, &headers).await?;
    let entries = vec![
        json!({ "Id": 10, "Name": "alice started playing Film", "Type": "VideoPlayback", "UserId": "u1", "ItemId": "i1", "Date": "2024-01-01T10:00:00Z" }),
        json!({ "Id": 11, "Name": "Scheduled task", "UserId": "00000000000000000000000000000000", "Date": "2024-01-01T11:00:00Z" }),
    ];
    Ok(Json(page(entries, &params)))
}

async fn sessions(
    State(state): State<StubState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    guard(&state, &headers).await?;
    Ok(Json(Value::Array(state.sessions.lock().await.clone())))
}

async fn spawn_stub() -> Result<(SocketAddr, StubState)> {
    let state = StubState::default();
    let app = Router::new()
        .route("/System/Info", get(system_info))
        .route("/Users", get(users))
        .route("/Library/VirtualFolders", get(libraries))
        .route("/Items", get(items))
        .route("/System/ActivityLog/Entries", get(activity))
        .route("/Sessions", get(sessions))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, state))
}

struct Harness {
    store: Arc<InMemoryStore>,
    worker: SyncWorker,
    server_id: i32,
}

async fn harness(addr: SocketAddr, api_key: &str) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let server = store
        .insert_server(
            NewServer {
                name: "Stub".into(),
                url: format!("http://{addr}"),
                api_key: api_key.into(),
            },
            ServerSyncState::default(),
        )
        .await;
    let worker = SyncWorker::new(
        AppUnitOfWork::in_memory(store.clone()),
        Arc::new(HttpJellyfinConnector::new(JellyfinClientConfig::default())),
        Arc::new(LiveSessionTracker::new()),
        SyncSettings {
            item_page_size: 2,
            activity_page_size: 1,
            recent_activity_pages: 1,
        },
    );
    Harness {
        store,
        worker,
        server_id: server.id,
    }
}

#[tokio::test]
async fn client_sends_the_api_key() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let client = JellyfinClient::new(
        &format!("http://{addr}"),
        API_KEY,
        &JellyfinClientConfig::default(),
    )?;
    let info = client.get_system_info().await?;
    assert_eq!(info.server_name.as_deref(), Some("Stub"));

    let wrong = JellyfinClient::new(
        &format!("http://{addr}"),
        "nope",
        &JellyfinClientConfig::default(),
    )?;
    let err = wrong.get_system_info().await.expect_err("rejected key");
    assert!(matches!(err, ProviderError::Unauthorized));
    Ok(())
}

#[tokio::test]
async fn full_sync_walks_every_phase() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let h = harness(addr, API_KEY).await;

    let report = h.worker.full_sync(h.server_id).await?;

    assert_eq!(report.users, 2);
    assert_eq!(report.libraries, 1);
    assert_eq!(report.items, 3);
    assert_eq!(report.activities, 2);
    assert!(report.warnings.is_empty());

    let server = h.store.get_server(h.server_id).await?.expect("server");
    assert_eq!(server.sync.sync_status, SyncStatus::Completed);
    assert_eq!(server.sync.sync_progress, SyncProgress::Completed);
    assert_eq!(server.sync.progress_percentage(), 100);
    assert!(server.sync.is_ready());
    assert!(server.sync.sync_error.is_none());
    assert!(server.sync.last_sync_completed >= server.sync.last_sync_started);

    let activities = h.store.activities().await;
    let system = activities.iter().find(|a| a.id == "11").expect("system event");
    assert_eq!(system.user_id, None);
    Ok(())
}

#[tokio::test]
async fn rejected_key_fails_the_run_at_the_first_phase() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let h = harness(addr, "wrong").await;

    let err = h.worker.full_sync(h.server_id).await.expect_err("unauthorized");
    assert!(matches!(err, StatsError::Provider(ProviderError::Unauthorized)));

    let server = h.store.get_server(h.server_id).await?.expect("server");
    assert_eq!(server.sync.sync_status, SyncStatus::Failed);
    assert_eq!(server.sync.sync_progress, SyncProgress::Users);
    assert!(server.sync.last_sync_started.is_some());
    assert!(server.sync.sync_error.is_some());
    Ok(())
}

#[tokio::test]
async fn gateway_errors_are_reported_as_unreachable() -> Result<()> {
    let (addr, state) = spawn_stub().await?;
    *state.unavailable.lock().await = true;
    let h = harness(addr, API_KEY).await;

    let err = h.worker.sync_recent_activities(h.server_id).await.expect_err("503");
    match err {
        StatsError::Provider(provider) => assert!(provider.is_connectivity()),
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn recent_activity_sync_leaves_status_alone() -> Result<()> {
    let (addr, _) = spawn_stub().await?;
    let h = harness(addr, API_KEY).await;

    let upserted = h.worker.sync_recent_activities(h.server_id).await?;

    assert_eq!(upserted, 1);
    let server = h.store.get_server(h.server_id).await?.expect("server");
    assert_eq!(server.sync.sync_status, SyncStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn finished_live_playback_is_stored_once() -> Result<()> {
    let (addr, state) = spawn_stub().await?;
    let h = harness(addr, API_KEY).await;
    *state.sessions.lock().await = vec![
        json!({
            "Id": "sess-1",
            "UserId": "u1",
            "UserName": "alice",
            "Client": "Web",
            "DeviceName": "Firefox",
            "PlayState": { "PositionTicks": 6_000_000_000i64, "PlayMethod": "Transcode" },
            "NowPlayingItem": { "Id": "i1", "Name": "Film", "RunTimeTicks": 72_000_000_000i64 },
            "TranscodingInfo": { "VideoCodec": "h264" }
        }),
        json!({ "Id": "idle", "UserName": "bob" }),
    ];

    assert_eq!(h.worker.poll_live_sessions(h.server_id).await?, 0);
    assert_eq!(h.worker.live_tracker().in_flight(h.server_id).await, 1);

    state.sessions.lock().await.clear();
    assert_eq!(h.worker.poll_live_sessions(h.server_id).await?, 1);
    assert_eq!(h.worker.poll_live_sessions(h.server_id).await?, 0);

    let stored = h.store.sessions().await;
    assert_eq!(stored.len(), 1);
    let session = &stored[0];
    assert!(!session.is_active);
    assert!(session.is_transcoded);
    assert_eq!(session.user_name, "alice");
    // Users and items were never synced, so both references degrade.
    assert_eq!(session.user_id, None);
    assert_eq!(session.item_id, None);
    assert_eq!(h.store.count_sessions(h.server_id).await?, 1);
    Ok(())
}

/// Session store that rejects writes while `down` is set.
struct FlakySessions {
    inner: Arc<InMemoryStore>,
    down: AtomicBool,
}

#[async_trait]
impl SessionRepository for FlakySessions {
    async fn insert_session(&self, session: &Session) -> jfstats_core::Result<bool> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StatsError::Internal("connection reset".into()));
        }
        self.inner.insert_session(session).await
    }

    async fn get_session(&self, id: &str) -> jfstats_core::Result<Option<Session>> {
        self.inner.get_session(id).await
    }

    async fn count_sessions(&self, server_id: i32) -> jfstats_core::Result<u64> {
        self.inner.count_sessions(server_id).await
    }

    fn stream_sessions(&self, server_id: i32) -> BoxStream<'_, jfstats_core::Result<Session>> {
        self.inner.stream_sessions(server_id)
    }
}

#[tokio::test]
async fn playback_survives_a_failed_store() -> Result<()> {
    let (addr, state) = spawn_stub().await?;
    let h = harness(addr, API_KEY).await;
    let sessions = Arc::new(FlakySessions {
        inner: h.store.clone(),
        down: AtomicBool::new(true),
    });
    let flaky: Arc<dyn SessionRepository> = sessions.clone();
    let mut uow = AppUnitOfWork::in_memory(h.store.clone());
    uow.sessions = flaky;
    let tracker = Arc::new(LiveSessionTracker::new());
    let worker = SyncWorker::new(
        uow,
        Arc::new(HttpJellyfinConnector::new(JellyfinClientConfig::default())),
        tracker.clone(),
        SyncSettings::default(),
    );

    *state.sessions.lock().await = vec![json!({
        "Id": "sess-1",
        "UserName": "alice",
        "PlayState": { "PositionTicks": 0 },
        "NowPlayingItem": { "Id": "i1", "Name": "Film", "RunTimeTicks": 72_000_000_000i64 }
    })];
    assert_eq!(worker.poll_live_sessions(h.server_id).await?, 0);

    state.sessions.lock().await.clear();
    assert_eq!(worker.poll_live_sessions(h.server_id).await?, 0);
    assert_eq!(tracker.unsaved(h.server_id).await, 1);
    assert_eq!(h.store.count_sessions(h.server_id).await?, 0);

    sessions.down.store(false, Ordering::SeqCst);
    assert_eq!(worker.poll_live_sessions(h.server_id).await?, 1);
    assert_eq!(tracker.unsaved(h.server_id).await, 0);
    assert_eq!(h.store.count_sessions(h.server_id).await?, 1);
    Ok(())
}
