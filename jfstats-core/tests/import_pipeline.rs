use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use jfstats_core::StatsError;
use jfstats_core::application::AppUnitOfWork;
use jfstats_core::database::InMemoryStore;
use jfstats_core::database::ports::CatalogRepository;
use jfstats_core::import::ImportPipeline;
use jfstats_model::{ItemRecord, SourceFormat, UserRecord};
use serde_json::json;

fn pipeline() -> (Arc<InMemoryStore>, ImportPipeline) {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = ImportPipeline::new(AppUnitOfWork::in_memory(store.clone()))
        .with_channel_capacity(4);
    (store, pipeline)
}

fn body(text: impl Into<String>) -> Cursor<Vec<u8>> {
    Cursor::new(text.into().into_bytes())
}

fn item(id: &str) -> ItemRecord {
    ItemRecord {
        id: id.to_string(),
        server_id: 1,
        name: "Film".into(),
        item_type: Some("Movie".into()),
        parent_id: None,
        series_id: None,
        series_name: None,
        season_id: None,
        index_number: None,
        parent_index_number: None,
        runtime_ticks: None,
        production_year: None,
        date_created: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wrapped_jellystats_backup_imports_activity_rows() -> Result<()> {
    let (store, pipeline) = pipeline();
    let file = json!([{
        "jf_playback_activity": [{
            "Id": "a",
            "UserName": "x",
            "PlaybackDuration": 120,
            "ActivityDateInserted": "2024-01-01T00:00:00Z",
            "PlayMethod": "DirectPlay"
        }]
    }]);

    let summary = pipeline
        .import_json(SourceFormat::Jellystats, 1, body(file.to_string()))
        .await?;

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.errors, 0);
    let sessions = store.sessions().await;
    assert_eq!(sessions[0].user_name, "x");
    assert_eq!(sessions[0].play_duration, 120);
    assert!(!sessions[0].is_transcoded);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn legacy_record_without_item_counts_as_error() -> Result<()> {
    let (store, pipeline) = pipeline();
    let file = json!([{ "id": "legacy-1", "user_name": "bob", "play_duration": "60" }]);

    let summary = pipeline
        .import_json(SourceFormat::Legacy, 1, body(file.to_string()))
        .await?;

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.total, 1);
    assert!(store.sessions().await.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reimporting_the_same_file_imports_nothing_new() -> Result<()> {
    let (_store, pipeline) = pipeline();
    let file = json!([
        { "id": "l1", "item_jellyfin_id": "i1", "user_name": "a", "play_duration": "10" },
        { "id": "l2", "item_jellyfin_id": "i2", "user_name": "b", "play_duration": "20" },
        { "id": "l3", "item_jellyfin_id": "i3", "user_name": "c", "play_duration": "30" }
    ])
    .to_string();

    let first = pipeline
        .import_json(SourceFormat::Legacy, 1, body(file.clone()))
        .await?;
    let second = pipeline
        .import_json(SourceFormat::Legacy, 1, body(file))
        .await?;

    assert_eq!(first.imported, 3);
    assert_eq!(first.total, second.total);
    assert_eq!(second.imported, 0);
    assert_eq!(second.errors, 0);
    assert_eq!(second.duplicates(), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_items_are_nulled_and_recorded() -> Result<()> {
    let (store, pipeline) = pipeline();
    store
        .upsert_user(&UserRecord {
            id: "u1".into(),
            server_id: 1,
            name: "alice".into(),
            is_administrator: false,
            last_login_date: None,
            last_activity_date: None,
        })
        .await?;
    store.upsert_item(&item("known")).await?;

    let file = json!([
        { "id": "s-missing", "item_jellyfin_id": "deleted-item", "user_jellyfin_id": "u1" },
        { "id": "s-known", "item_jellyfin_id": "known", "user_jellyfin_id": "u1" }
    ]);
    let summary = pipeline
        .import_json(SourceFormat::Legacy, 1, body(file.to_string()))
        .await?;
    assert_eq!(summary.imported, 2);

    let sessions = store.sessions().await;
    let missing = sessions
        .iter()
        .find(|s| s.id == "s-missing")
        .expect("degraded session stored");
    assert_eq!(missing.item_id, None);
    assert_eq!(missing.user_id.as_deref(), Some("u1"));
    assert_eq!(
        missing.raw_data["missingReferences"][0]["id"],
        json!("deleted-item")
    );
    assert_eq!(missing.raw_data["missingReferences"][0]["table"], json!("items"));

    let known = sessions.iter().find(|s| s.id == "s-known").expect("stored");
    assert_eq!(known.item_id.as_deref(), Some("known"));
    assert!(known.raw_data.get("missingReferences").is_none());
    Ok(())
}

#[tokio::test]
async fn short_tsv_lines_are_skipped_not_fatal() -> Result<()> {
    let (store, pipeline) = pipeline();
    let tsv = "Timestamp\tUserId\tItemId\tItemType\tItemName\tPlayMethod\tClientName\tDeviceName\tPlayDuration\n\
               2024-05-01T10:00:00Z\tu1\ti1\tEpisode\tShow - s01e02 - Title\tDirectPlay\tWeb\tChrome\t600\n\
               2024-05-01T11:00:00Z\tu1\ti2\n\
               \n\
               2024-05-02 09:30:00\tu2\ti3\tMovie\tFilm\tTranscode\tAndroid\tPixel\t5400\r\n";

    let summary = pipeline.import_tsv(7, body(tsv)).await?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.errors, 0);

    let sessions = store.sessions().await;
    let episode = sessions
        .iter()
        .find(|s| s.series_name.is_some())
        .expect("episode row");
    assert_eq!(episode.series_name.as_deref(), Some("Show"));
    assert_eq!(episode.play_duration, 600);
    assert!(episode.completed);
    assert_eq!(episode.server_id, 7);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn playback_reporting_json_probes_key_variants() -> Result<()> {
    let (store, pipeline) = pipeline();
    let file = json!([
        { "Timestamp": "2024-05-01T10:00:00Z", "UserId": "u1", "ItemId": "i1", "PlayDuration": 30 },
        { "date_created": "2024-05-01 12:00:00", "user_id": "u1", "item_id": "i2", "play_duration": "45" },
        { "userId": "u1", "itemId": "no-timestamp" }
    ]);

    let summary = pipeline
        .import(SourceFormat::PlaybackReporting, 1, body(file.to_string()), false)
        .await?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    let durations: Vec<i64> = store.sessions().await.iter().map(|s| s.play_duration).collect();
    assert_eq!(durations, vec![30, 45]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_upload_is_an_import_error() {
    let (_store, pipeline) = pipeline();

    let err = pipeline
        .import_json(SourceFormat::Jellystats, 1, body("[]"))
        .await
        .expect_err("nothing to import");
    assert!(matches!(err, StatsError::Import(ref msg) if msg.contains("No records found")));

    let err = pipeline
        .import_json(SourceFormat::Jellystats, 1, body(r#"{"jf_users": []}"#))
        .await
        .expect_err("no activity section");
    assert!(matches!(err, StatsError::Import(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn truncated_upload_keeps_processed_records() -> Result<()> {
    let (store, pipeline) = pipeline();
    let truncated = r#"[
        { "id": "t1", "item_jellyfin_id": "i1" },
        { "id": "t2", "item_jellyfin_id": "i2" },
        { "id": "t3", "item_jel"#;

    let summary = pipeline
        .import_json(SourceFormat::Legacy, 1, body(truncated))
        .await?;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(store.sessions().await.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bare_objects_after_a_wrapper_are_ignored() -> Result<()> {
    let (store, pipeline) = pipeline();
    let file = json!([
        { "jf_playback_activity": [
            { "Id": "w1", "ActivityDateInserted": "2024-01-01T00:00:00Z" }
        ] },
        { "Id": "bare-after-wrapper", "ActivityDateInserted": "2024-01-02T00:00:00Z" }
    ]);

    let summary = pipeline
        .import_json(SourceFormat::Jellystats, 1, body(file.to_string()))
        .await?;

    assert_eq!(summary.total, 1);
    let ids: Vec<String> = store.sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["w1".to_string()]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn non_activity_sections_keep_bare_sessions() -> Result<()> {
    let (store, pipeline) = pipeline();
    let file = json!([
        { "jf_users": [ { "Id": "u" } ] },
        { "Id": "a", "UserName": "x", "ActivityDateInserted": "2024-01-01T00:00:00Z" }
    ]);

    let summary = pipeline
        .import_json(SourceFormat::Jellystats, 1, body(file.to_string()))
        .await?;

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.total, 1);
    let ids: Vec<String> = store.sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["a".to_string()]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn huge_durations_fail_one_record_not_the_batch() -> Result<()> {
    let (store, pipeline) = pipeline();
    let file = json!([
        { "Id": "ok", "ActivityDateInserted": "2024-01-01T00:00:00Z", "PlaybackDuration": 60 },
        { "Id": "bad", "ActivityDateInserted": "2024-01-01T00:00:00Z", "PlaybackDuration": 9_000_000_000_000_000_i64 },
        { "Id": "after", "ActivityDateInserted": "2024-01-01T01:00:00Z", "PlaybackDuration": 30 }
    ]);

    let summary = tokio::spawn(async move {
        pipeline
            .import_json(SourceFormat::Jellystats, 1, body(file.to_string()))
            .await
    })
    .await??;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.errors, 1);
    let mut ids: Vec<String> = store.sessions().await.into_iter().map(|s| s.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["after".to_string(), "ok".to_string()]);
    Ok(())
}

#[tokio::test]
async fn huge_tsv_duration_is_a_record_error() -> Result<()> {
    let (store, pipeline) = pipeline();
    let tsv = "2024-05-01T10:00:00Z\tu1\ti1\tMovie\tFilm\tDirectPlay\tWeb\tChrome\t600\n\
               2024-05-01T11:00:00Z\tu1\ti2\tMovie\tFilm\tDirectPlay\tWeb\tChrome\t9000000000000000000\n\
               2024-05-01T12:00:00Z\tu1\ti3\tMovie\tFilm\tDirectPlay\tWeb\tChrome\t60\n";

    let summary = pipeline.import_tsv(1, body(tsv)).await?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(store.sessions().await.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn items_of_another_server_do_not_resolve() -> Result<()> {
    let (store, pipeline) = pipeline();
    store.upsert_item(&item("shared")).await?;

    let file = json!([{ "id": "s2", "item_jellyfin_id": "shared", "user_name": "a" }]);
    let summary = pipeline
        .import_json(SourceFormat::Legacy, 2, body(file.to_string()))
        .await?;
    assert_eq!(summary.imported, 1);

    let sessions = store.sessions().await;
    assert_eq!(sessions[0].server_id, 2);
    assert_eq!(sessions[0].item_id, None);
    assert_eq!(sessions[0].raw_data["missingReferences"][0]["id"], "shared");
    Ok(())
}

#[tokio::test]
async fn over_long_tsv_line_is_skipped() -> Result<()> {
    let (store, pipeline) = pipeline();
    let pipeline = pipeline.with_max_line_bytes(256);
    let tsv = format!(
        "2024-05-01T10:00:00Z\tu1\ti1\tMovie\tFilm\tDirectPlay\tWeb\tChrome\t600\n\
         {}\n\
         2024-05-01T12:00:00Z\tu1\ti3\tMovie\tFilm\tDirectPlay\tWeb\tChrome\t60\n",
        "y".repeat(10_000)
    );

    let summary = pipeline.import_tsv(1, body(tsv)).await?;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.imported, 2);
    assert_eq!(store.sessions().await.len(), 2);
    Ok(())
}
