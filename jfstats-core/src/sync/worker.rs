use std::sync::Arc;

use chrono::Utc;
use jfstats_model::{ServerRecord, SyncProgress};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::AppUnitOfWork;
use crate::error::{Result, StatsError};
use crate::providers::{JellyfinApi, JellyfinConnector};
use crate::reconcile::ReferenceResolver;

use super::live::LiveSessionTracker;
use super::tracker::SyncStatusTracker;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub item_page_size: u32,
    pub activity_page_size: u32,
    /// Activity log pages fetched by the recurring recent-activity job.
    pub recent_activity_pages: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            item_page_size: 500,
            activity_page_size: 100,
            recent_activity_pages: 1,
        }
    }
}

/// Entity counts of one full sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub users: u64,
    pub libraries: u64,
    pub items: u64,
    pub activities: u64,
    pub warnings: Vec<String>,
}

/// Pulls Jellyfin data for one server into the repositories.
pub struct SyncWorker {
    uow: AppUnitOfWork,
    connector: Arc<dyn JellyfinConnector>,
    live: Arc<LiveSessionTracker>,
    settings: SyncSettings,
}

impl std::fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorker")
            .field("uow", &self.uow)
            .field("settings", &self.settings)
            .finish()
    }
}

impl SyncWorker {
    pub fn new(
        uow: AppUnitOfWork,
        connector: Arc<dyn JellyfinConnector>,
        live: Arc<LiveSessionTracker>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            uow,
            connector,
            live,
            settings,
        }
    }

    async fn load_server(&self, server_id: i32) -> Result<ServerRecord> {
        self.uow
            .servers
            .get_server(server_id)
            .await?
            .ok_or_else(|| StatsError::NotFound(format!("server {server_id}")))
    }

    fn connect(&self, server: &ServerRecord) -> Result<Arc<dyn JellyfinApi>> {
        Ok(self.connector.connect(&server.url, &server.api_key)?)
    }

    /// Runs users, libraries, items and activities in order. Entity-level
    /// write failures become warnings; any fetch failure fails the run.
    #[instrument(skip(self))]
    pub async fn full_sync(&self, server_id: i32) -> Result<SyncReport> {
        let server = self.load_server(server_id).await?;
        let mut tracker =
            SyncStatusTracker::new(self.uow.servers.clone(), server.id, server.sync.clone());
        tracker.begin().await?;

        match self.run_phases(&server, &mut tracker).await {
            Ok(report) => {
                tracker.complete(&report.warnings).await?;
                info!(
                    server_id,
                    users = report.users,
                    libraries = report.libraries,
                    items = report.items,
                    activities = report.activities,
                    warnings = report.warnings.len(),
                    "full sync finished"
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(persist) = tracker.fail(err.to_string()).await {
                    warn!(server_id, error = %persist, "could not record sync failure");
                }
                Err(err)
            }
        }
    }

    async fn run_phases(
        &self,
        server: &ServerRecord,
        tracker: &mut SyncStatusTracker,
    ) -> Result<SyncReport> {
        let api = self.connect(server)?;
        let mut report = SyncReport::default();

        tracker.enter_phase(SyncProgress::Users).await?;
        for user in api.get_users().await? {
            let Some(record) = user.into_record(server.id) else {
                continue;
            };
            match self.uow.catalog.upsert_user(&record).await {
                Ok(()) => report.users += 1,
                Err(err) => report.warnings.push(format!("user {}: {err}", record.id)),
            }
        }

        tracker.enter_phase(SyncProgress::Libraries).await?;
        for folder in api.get_libraries().await? {
            let Some(record) = folder.into_record(server.id) else {
                continue;
            };
            match self.uow.catalog.upsert_library(&record).await {
                Ok(()) => report.libraries += 1,
                Err(err) => report.warnings.push(format!("library {}: {err}", record.id)),
            }
        }

        tracker.enter_phase(SyncProgress::Items).await?;
        let mut start = 0u32;
        loop {
            let page = api.get_items(start, self.settings.item_page_size).await?;
            let fetched = page.items.len() as u32;
            debug!(server_id = server.id, start, fetched, total = page.total_record_count, "item page");
            for item in page.items {
                let Some(record) = item.into_record(server.id) else {
                    continue;
                };
                match self.uow.catalog.upsert_item(&record).await {
                    Ok(()) => report.items += 1,
                    Err(err) => report.warnings.push(format!("item {}: {err}", record.id)),
                }
            }
            start += fetched;
            if fetched == 0 || i64::from(start) >= page.total_record_count {
                break;
            }
        }

        tracker.enter_phase(SyncProgress::Activities).await?;
        let (activities, warnings) = self.sync_activity_pages(&*api, server.id, None).await?;
        report.activities = activities;
        report.warnings.extend(warnings);

        Ok(report)
    }

    async fn sync_activity_pages(
        &self,
        api: &dyn JellyfinApi,
        server_id: i32,
        max_pages: Option<u32>,
    ) -> Result<(u64, Vec<String>)> {
        let mut start = 0u32;
        let mut pages = 0u32;
        let mut upserted = 0u64;
        let mut warnings = Vec::new();
        loop {
            let page = api
                .get_activity_log(start, self.settings.activity_page_size, None)
                .await?;
            let fetched = page.items.len() as u32;
            for entry in page.items {
                let Some(record) = entry.into_record(server_id) else {
                    continue;
                };
                match self.uow.catalog.upsert_activity(&record).await {
                    Ok(()) => upserted += 1,
                    Err(err) => warnings.push(format!("activity {}: {err}", record.id)),
                }
            }
            start += fetched;
            pages += 1;
            let exhausted = fetched == 0 || i64::from(start) >= page.total_record_count;
            if exhausted || max_pages.is_some_and(|max| pages >= max) {
                break;
            }
        }
        Ok((upserted, warnings))
    }

    /// Refreshes the newest activity log pages without touching sync status.
    #[instrument(skip(self))]
    pub async fn sync_recent_activities(&self, server_id: i32) -> Result<u64> {
        let server = self.load_server(server_id).await?;
        let api = self.connect(&server)?;
        let (upserted, warnings) = self
            .sync_activity_pages(&*api, server.id, Some(self.settings.recent_activity_pages.max(1)))
            .await?;
        for warning in &warnings {
            warn!(server_id, warning = %warning, "recent activity upsert failed");
        }
        debug!(server_id, upserted, "recent activities synced");
        Ok(upserted)
    }

    /// Polls `/Sessions` and persists playbacks that ended since the last poll.
    pub async fn poll_live_sessions(&self, server_id: i32) -> Result<u64> {
        let server = self.load_server(server_id).await?;
        let api = self.connect(&server)?;
        let snapshot = api.get_sessions().await?;
        let ended = self.live.observe(server.id, &snapshot, Utc::now()).await;

        let mut stored = 0u64;
        let mut unsaved = Vec::new();
        for mut session in ended {
            ReferenceResolver::new(self.uow.references.as_ref())
                .apply(&mut session)
                .await;
            match self.uow.sessions.insert_session(&session).await {
                Ok(true) => stored += 1,
                Ok(false) => debug!(server_id, session_id = %session.id, "playback already stored"),
                Err(err) => {
                    warn!(
                        server_id,
                        session_id = %session.id,
                        error = %err,
                        "failed to store finished playback, retrying next poll"
                    );
                    unsaved.push(session);
                }
            }
        }
        self.live.requeue(unsaved).await;
        Ok(stored)
    }

    pub fn live_tracker(&self) -> &Arc<LiveSessionTracker> {
        &self.live
    }
}
