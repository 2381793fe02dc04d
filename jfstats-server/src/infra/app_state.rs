use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use jfstats_core::application::AppUnitOfWork;
use jfstats_core::database::PostgresDatabase;
use jfstats_core::import::{DEFAULT_CHANNEL_CAPACITY, ImportPipeline};
use jfstats_core::providers::JellyfinConnector;
use jfstats_core::sync::{JobQueue, StuckSyncSweeper};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub unit_of_work: AppUnitOfWork,
    /// `None` when running on the in-memory store.
    pub postgres: Option<Arc<PostgresDatabase>>,
    pub connector: Arc<dyn JellyfinConnector>,
    pub jobs: JobQueue,
    pub sweeper: Arc<StuckSyncSweeper>,
    pub importer: ImportPipeline,
    pub max_upload_bytes: usize,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("unit_of_work", &self.unit_of_work)
            .field("postgres", &self.postgres.is_some())
            .field("connector", &type_name_of_val(self.connector.as_ref()))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        unit_of_work: AppUnitOfWork,
        connector: Arc<dyn JellyfinConnector>,
        jobs: JobQueue,
        sweeper: Arc<StuckSyncSweeper>,
    ) -> Self {
        let importer = ImportPipeline::new(unit_of_work.clone())
            .with_channel_capacity(DEFAULT_CHANNEL_CAPACITY);
        Self {
            unit_of_work,
            postgres: None,
            connector,
            jobs,
            sweeper,
            importer,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_postgres(mut self, postgres: Arc<PostgresDatabase>) -> Self {
        self.postgres = Some(postgres);
        self
    }

    pub fn with_import_limits(mut self, max_upload_bytes: usize, channel_capacity: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self.importer =
            ImportPipeline::new(self.unit_of_work.clone()).with_channel_capacity(channel_capacity);
        self
    }
}
