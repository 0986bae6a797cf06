//! Time-based reclamation of jobs and transient artifacts.
//!
//! The sweeping logic lives in [`RetentionSweeper::sweep_once`] so it is
//! testable without waiting on real timers; [`spawn_sweeper`] is the periodic
//! driver. Sweeping runs independently of request handling: it only needs
//! snapshot reads of `created_at` and outcome locations, never a write lock
//! on the whole store.

use crate::storage::ArtifactStorage;
use crate::store::JobStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub struct RetentionSweeper {
    store: Arc<dyn JobStore>,
    storage: Arc<ArtifactStorage>,
    window: Duration,
}

/// What one sweep pass reclaimed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub jobs_removed: usize,
    pub artifacts_removed: usize,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn JobStore>, storage: Arc<ArtifactStorage>, window: Duration) -> Self {
        Self {
            store,
            storage,
            window,
        }
    }

    /// One reclamation pass.
    ///
    /// For every job older than the retention window, deletes each outcome's
    /// output artifact and each request's uploaded source, then removes the
    /// job record. Deletion is best-effort: artifacts already gone are not an
    /// error. Orphaned files in either storage directory age out on mtime.
    pub fn sweep_once(&self) -> SweepStats {
        let window = chrono::Duration::from_std(self.window)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let cutoff = Utc::now() - window;

        let mut stats = SweepStats::default();

        for job in self.store.list_expired(cutoff) {
            for outcome in &job.outcomes {
                if let Some(ref output) = outcome.output {
                    self.storage.delete(output);
                    stats.artifacts_removed += 1;
                }
            }
            for request in &job.requests {
                self.storage.delete(&request.source);
                stats.artifacts_removed += 1;
            }
            if self.store.delete(job.id) {
                stats.jobs_removed += 1;
                tracing::info!(
                    job_id = %job.id,
                    age_mins = (Utc::now() - job.created_at).num_minutes(),
                    "Expired job removed"
                );
            }
        }

        for path in self.storage.stale_files(cutoff) {
            self.storage.delete(&path);
            stats.artifacts_removed += 1;
        }

        if stats.jobs_removed > 0 || stats.artifacts_removed > 0 {
            tracing::debug!(
                jobs = stats.jobs_removed,
                artifacts = stats.artifacts_removed,
                "Sweep complete"
            );
        }
        stats
    }
}

/// Start a background task that periodically runs the sweeper.
///
/// Stop it by aborting the returned handle.
pub fn spawn_sweeper(
    sweeper: Arc<RetentionSweeper>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            sweeper.sweep_once();
        }
    })
}
