//! Authoritative state for in-flight and completed conversion jobs.
//!
//! The store is the only structure mutated by more than one actor: execution
//! tasks append outcomes, the retention sweeper deletes entries, and status
//! polls read concurrently. All mutations to a single job happen under one
//! write-lock section so readers only ever observe consistent snapshots.

mod types;

pub use types::*;

use alembic_common::JobId;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Backing store for jobs.
///
/// In-memory is sufficient for a single-process deployment; the trait keeps
/// it swappable for a durable store without touching the scheduler.
pub trait JobStore: Send + Sync {
    /// Insert or replace a job record.
    fn put(&self, job: Job);

    /// Snapshot of a job. Never returns a torn record.
    fn get(&self, id: JobId) -> Option<Job>;

    /// Apply a mutation atomically with respect to concurrent readers.
    /// Returns false when the job no longer exists.
    fn update(&self, id: JobId, mutate: &mut dyn FnMut(&mut Job)) -> bool;

    /// Remove a job record.
    fn delete(&self, id: JobId) -> bool;

    /// Snapshots of every job created before `cutoff`.
    fn list_expired(&self, cutoff: DateTime<Utc>) -> Vec<Job>;

    /// Number of stored jobs.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory job store.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn put(&self, job: Job) {
        self.jobs.write().insert(job.id, job);
    }

    fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().get(&id).cloned()
    }

    fn update(&self, id: JobId, mutate: &mut dyn FnMut(&mut Job)) -> bool {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(&id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    fn delete(&self, id: JobId) -> bool {
        self.jobs.write().remove(&id).is_some()
    }

    fn list_expired(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        self.jobs
            .read()
            .values()
            .filter(|job| job.created_at < cutoff)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.jobs.read().len()
    }
}
