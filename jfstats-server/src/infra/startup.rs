use std::sync::Arc;

use anyhow::Context;
use jfstats_config::Config;
use jfstats_core::application::AppUnitOfWork;
use jfstats_core::database::PostgresDatabase;
use jfstats_core::providers::{HttpJellyfinConnector, JellyfinClientConfig, JellyfinConnector};
use jfstats_core::sync::{
    JobSchedule, JobServer, LiveSessionTracker, StuckSyncSweeper, SyncSettings, SyncWorker,
};
use tracing::info;

use super::app_state::AppState;

/// Everything `main` needs to serve and later shut down.
#[derive(Debug)]
pub struct Runtime {
    pub state: AppState,
    pub jobs: JobServer,
}

pub async fn connect_database(config: &Config) -> anyhow::Result<Arc<PostgresDatabase>> {
    let postgres = PostgresDatabase::new(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    postgres
        .ping()
        .await
        .context("PostgreSQL did not answer the startup ping")?;
    Ok(Arc::new(postgres))
}

/// Wires repositories, the Jellyfin connector and the job server from the
/// loaded configuration.
pub async fn bootstrap(config: &Config) -> anyhow::Result<Runtime> {
    let postgres = connect_database(config).await?;
    let unit_of_work = AppUnitOfWork::from_postgres(&postgres);

    let connector: Arc<dyn JellyfinConnector> =
        Arc::new(HttpJellyfinConnector::new(JellyfinClientConfig {
            request_timeout: config.jellyfin.request_timeout,
            user_agent: config.jellyfin.user_agent.clone(),
        }));

    let worker = Arc::new(SyncWorker::new(
        unit_of_work.clone(),
        Arc::clone(&connector),
        Arc::new(LiveSessionTracker::new()),
        SyncSettings {
            item_page_size: config.sync.item_page_size,
            activity_page_size: config.sync.activity_page_size,
            recent_activity_pages: config.sync.recent_activity_pages,
        },
    ));
    let sweeper = Arc::new(StuckSyncSweeper::new(
        unit_of_work.servers.clone(),
        config.sync.stuck_threshold,
    ));

    let jobs = JobServer::start(
        worker,
        Arc::clone(&sweeper),
        unit_of_work.servers.clone(),
        JobSchedule {
            workers: config.sync.workers,
            live_poll_interval: config.sync.live_poll_interval,
            recent_activity_interval: config.sync.recent_activity_interval,
            sweep_interval: config.sync.sweep_interval,
            ..JobSchedule::default()
        },
    );

    let max_upload = usize::try_from(config.import.max_upload_bytes)
        .context("import.max_upload_bytes exceeds the platform's address space")?;
    let state = AppState::new(unit_of_work, connector, jobs.queue(), sweeper)
        .with_postgres(postgres)
        .with_import_limits(max_upload, config.import.channel_capacity);

    info!(
        workers = config.sync.workers,
        stuck_threshold_secs = config.sync.stuck_threshold.as_secs(),
        "runtime ready"
    );
    Ok(Runtime { state, jobs })
}
