//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds the full orchestration stack (tool
//! discovery, backend probing, registry, artifact storage, job store, and
//! scheduler) on top of a temporary directory. The text-based document
//! conversions need no external tools, so they anchor the end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use alembic::registry::CapabilityRegistry;
use alembic::scheduler::Scheduler;
use alembic::storage::ArtifactStorage;
use alembic::store::{Job, JobState, MemoryJobStore};
use alembic_backends::{probe_backends, ToolPaths, ToolRegistry};
use alembic_common::{ConversionRequest, ConvertOptions, FormatToken, JobId};
use tempfile::TempDir;

pub struct TestHarness {
    pub scheduler: Scheduler,
    pub store: Arc<MemoryJobStore>,
    pub storage: Arc<ArtifactStorage>,
    pub registry: Arc<CapabilityRegistry>,
    pub tools: Arc<ToolRegistry>,
    _root: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp dir");
        let storage = Arc::new(
            ArtifactStorage::new(root.path().join("uploads"), root.path().join("converted"))
                .expect("failed to create storage"),
        );
        let tools = Arc::new(ToolRegistry::discover(&ToolPaths::default()));
        let registry = Arc::new(CapabilityRegistry::from_backends(probe_backends(&tools)));
        let store = Arc::new(MemoryJobStore::new());
        let scheduler = Scheduler::new(registry.clone(), store.clone(), storage.clone());

        Self {
            scheduler,
            store,
            storage,
            registry,
            tools,
            _root: root,
        }
    }

    /// Store `content` as an uploaded text file and build a request
    /// converting it to `target`.
    pub fn text_request(&self, filename: &str, content: &str, target: &str) -> ConversionRequest {
        let source = self
            .storage
            .store_upload(filename, content.as_bytes())
            .expect("failed to store upload");
        ConversionRequest {
            source,
            original_filename: filename.to_string(),
            source_format: FormatToken::new("txt"),
            target_format: FormatToken::new(target),
            options: ConvertOptions::default(),
        }
    }

    /// A request whose source artifact was never stored.
    pub fn missing_source_request(&self, filename: &str, target: &str) -> ConversionRequest {
        ConversionRequest {
            source: self.storage.upload_dir().join(format!("gone_{filename}")),
            original_filename: filename.to_string(),
            source_format: FormatToken::new("txt"),
            target_format: FormatToken::new(target),
            options: ConvertOptions::default(),
        }
    }

    /// Poll until the job reaches a terminal state.
    pub async fn wait_terminal(&self, id: JobId) -> Job {
        for _ in 0..400 {
            let job = self.scheduler.status(id).expect("job vanished mid-wait");
            if matches!(job.state, JobState::Completed | JobState::Failed) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {id} did not reach a terminal state in time");
    }
}
