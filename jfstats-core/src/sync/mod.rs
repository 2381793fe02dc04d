pub mod jobs;
pub mod live;
pub mod recovery;
pub mod state;
pub mod tracker;
pub mod worker;

pub use jobs::{JobQueue, JobSchedule, JobServer, SyncJob};
pub use live::LiveSessionTracker;
pub use recovery::{DEFAULT_STUCK_THRESHOLD, StuckSyncSweeper};
pub use state::SyncTransitions;
pub use tracker::SyncStatusTracker;
pub use worker::{SyncReport, SyncSettings, SyncWorker};
