//! Pure transitions of a server's sync bookkeeping.

use chrono::{DateTime, Utc};
use jfstats_model::{ServerSyncState, SyncProgress, SyncStatus};

use crate::error::{Result, StatsError};

/// Upper bound on how many warnings are spelled out in `sync_error`.
const MAX_LISTED_WARNINGS: usize = 5;

pub trait SyncTransitions {
    /// Enters `syncing`, clears the previous error and restarts the phases.
    fn begin(&mut self, now: DateTime<Utc>);

    /// Moves to the next phase. Phases only move forward within a run.
    fn enter_phase(&mut self, phase: SyncProgress) -> Result<()>;

    /// Finishes the run. Non-empty `warnings` mean partial success: the
    /// status is still `completed` and the summary lands in `sync_error`.
    fn complete(&mut self, now: DateTime<Utc>, warnings: &[String]);

    /// Marks the run failed. Progress stays on the failing phase.
    fn fail(&mut self, message: impl Into<String>);

    /// Operator or sweeper override out of a stuck `syncing` state.
    fn force_reset(&mut self, now: DateTime<Utc>, reason: impl Into<String>);
}

impl SyncTransitions for ServerSyncState {
    fn begin(&mut self, now: DateTime<Utc>) {
        self.sync_status = SyncStatus::Syncing;
        self.sync_progress = SyncProgress::NotStarted;
        self.sync_error = None;
        self.last_sync_started = Some(now);
    }

    fn enter_phase(&mut self, phase: SyncProgress) -> Result<()> {
        if self.sync_status != SyncStatus::Syncing {
            return Err(StatsError::InvalidTransition(format!(
                "cannot enter phase {phase} while {}",
                self.sync_status
            )));
        }
        if phase <= self.sync_progress || phase == SyncProgress::Completed {
            return Err(StatsError::InvalidTransition(format!(
                "phase {phase} does not follow {}",
                self.sync_progress
            )));
        }
        self.sync_progress = phase;
        Ok(())
    }

    fn complete(&mut self, now: DateTime<Utc>, warnings: &[String]) {
        self.sync_status = SyncStatus::Completed;
        self.sync_progress = SyncProgress::Completed;
        self.last_sync_completed = Some(now);
        self.sync_error = summarize_warnings(warnings);
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.sync_status = SyncStatus::Failed;
        self.sync_error = Some(message.into());
    }

    fn force_reset(&mut self, now: DateTime<Utc>, reason: impl Into<String>) {
        self.sync_status = SyncStatus::Completed;
        self.sync_progress = SyncProgress::Completed;
        self.sync_error = Some(reason.into());
        self.last_sync_completed = Some(now);
    }
}

fn summarize_warnings(warnings: &[String]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }
    let listed = warnings
        .iter()
        .take(MAX_LISTED_WARNINGS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ");
    let more = warnings.len().saturating_sub(MAX_LISTED_WARNINGS);
    let mut summary = format!(
        "Completed with {} warning{}: {listed}",
        warnings.len(),
        if warnings.len() == 1 { "" } else { "s" }
    );
    if more > 0 {
        summary.push_str(&format!(" (and {more} more)"));
    }
    Some(summary)
}
