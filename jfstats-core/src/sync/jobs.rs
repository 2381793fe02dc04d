//! In-process job server: a bounded queue drained by a fixed set of workers,
//! fed by HTTP handlers and by interval schedules.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::database::ports::ServerRepository;
use crate::error::{Result, StatsError};

use super::recovery::StuckSyncSweeper;
use super::worker::SyncWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncJob {
    FullSync { server_id: i32 },
    RecentActivities { server_id: i32 },
    LiveSessions { server_id: i32 },
    StuckSweep,
}

impl fmt::Display for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncJob::FullSync { server_id } => write!(f, "full-sync(server={server_id})"),
            SyncJob::RecentActivities { server_id } => {
                write!(f, "recent-activities(server={server_id})")
            }
            SyncJob::LiveSessions { server_id } => write!(f, "live-sessions(server={server_id})"),
            SyncJob::StuckSweep => f.write_str("stuck-sweep"),
        }
    }
}

/// Producer side of the job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<SyncJob>,
}

impl JobQueue {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub async fn enqueue(&self, job: SyncJob) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| StatsError::Internal("job queue is closed".into()))?;
        debug!(%job, "job enqueued");
        Ok(())
    }

    /// Drops the job when the queue is full. Used by schedules, where the
    /// next tick enqueues the same work again anyway.
    pub fn try_enqueue(&self, job: SyncJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(%job, "job queue full, dropping scheduled job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobSchedule {
    pub workers: usize,
    pub queue_capacity: usize,
    pub live_poll_interval: Duration,
    pub recent_activity_interval: Duration,
    pub sweep_interval: Duration,
}

impl Default for JobSchedule {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 256,
            live_poll_interval: Duration::from_secs(10),
            recent_activity_interval: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Running workers and schedulers. Dropping the handle does not stop them;
/// call [`JobServer::shutdown`].
pub struct JobServer {
    queue: JobQueue,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for JobServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobServer")
            .field("tasks", &self.tasks.len())
            .field("shutdown_cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl JobServer {
    pub fn start(
        worker: Arc<SyncWorker>,
        sweeper: Arc<StuckSyncSweeper>,
        servers: Arc<dyn ServerRepository>,
        schedule: JobSchedule,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (queue, rx) = JobQueue::bounded(schedule.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let mut tasks = Vec::new();

        for index in 0..schedule.workers.max(1) {
            tasks.push(tokio::spawn(run_worker(
                index,
                Arc::clone(&rx),
                Arc::clone(&worker),
                Arc::clone(&sweeper),
                shutdown.clone(),
            )));
        }

        tasks.push(tokio::spawn(run_schedule(
            "live-sessions",
            schedule.live_poll_interval,
            queue.clone(),
            Arc::clone(&servers),
            shutdown.clone(),
            |server_id| SyncJob::LiveSessions { server_id },
        )));
        tasks.push(tokio::spawn(run_schedule(
            "recent-activities",
            schedule.recent_activity_interval,
            queue.clone(),
            Arc::clone(&servers),
            shutdown.clone(),
            |server_id| SyncJob::RecentActivities { server_id },
        )));
        tasks.push(tokio::spawn(run_sweep_schedule(
            schedule.sweep_interval,
            queue.clone(),
            shutdown.clone(),
        )));

        info!(workers = schedule.workers.max(1), "job server started");
        Self {
            queue,
            shutdown,
            tasks,
        }
    }

    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "job server task ended abnormally");
            }
        }
        info!("job server stopped");
    }
}

async fn run_worker(
    index: usize,
    rx: Arc<Mutex<mpsc::Receiver<SyncJob>>>,
    worker: Arc<SyncWorker>,
    sweeper: Arc<StuckSyncSweeper>,
    shutdown: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => break,
            job = async { rx.lock().await.recv().await } => match job {
                Some(job) => job,
                None => break,
            },
        };
        debug!(worker = index, %job, "job started");
        if let Err(err) = execute(&worker, &sweeper, job).await {
            match &err {
                StatsError::Provider(provider) if provider.is_connectivity() => {
                    warn!(worker = index, %job, error = %err, "Jellyfin server unreachable");
                }
                _ => error!(worker = index, %job, error = %err, "job failed"),
            }
        }
    }
    debug!(worker = index, "worker stopped");
}

pub async fn execute(worker: &SyncWorker, sweeper: &StuckSyncSweeper, job: SyncJob) -> Result<()> {
    match job {
        SyncJob::FullSync { server_id } => worker.full_sync(server_id).await.map(|_| ()),
        SyncJob::RecentActivities { server_id } => {
            worker.sync_recent_activities(server_id).await.map(|_| ())
        }
        SyncJob::LiveSessions { server_id } => {
            worker.poll_live_sessions(server_id).await.map(|_| ())
        }
        SyncJob::StuckSweep => sweeper.sweep(Utc::now()).await.map(|_| ()),
    }
}

async fn run_schedule(
    name: &'static str,
    period: Duration,
    queue: JobQueue,
    servers: Arc<dyn ServerRepository>,
    shutdown: CancellationToken,
    job_for: fn(i32) -> SyncJob,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        match servers.list_servers().await {
            Ok(list) => {
                for server in &list {
                    queue.try_enqueue(job_for(server.id));
                }
            }
            Err(err) => warn!(schedule = name, error = %err, "could not list servers"),
        }
    }
    debug!(schedule = name, "schedule stopped");
}

async fn run_sweep_schedule(period: Duration, queue: JobQueue, shutdown: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        queue.try_enqueue(SyncJob::StuckSweep);
    }
}
