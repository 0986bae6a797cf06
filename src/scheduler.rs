//! Job scheduling and background execution.
//!
//! `submit` validates every request, persists a Pending job, and returns its
//! id immediately; a spawned task then works through the job's requests
//! strictly in order. Independent jobs run concurrently, files within one job
//! never do: conversions shell out to memory- and CPU-heavy external tools,
//! so per-file parallelism inside a job risks resource exhaustion.

use crate::registry::CapabilityRegistry;
use crate::resolver::{self, Resolution};
use crate::storage::ArtifactStorage;
use crate::store::{Job, JobStore};
use alembic_backends::ConvertTask;
use alembic_common::{ConversionOutcome, ConversionRequest, Error, JobId, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<CapabilityRegistry>,
    store: Arc<dyn JobStore>,
    storage: Arc<ArtifactStorage>,
}

impl Scheduler {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        store: Arc<dyn JobStore>,
        storage: Arc<ArtifactStorage>,
    ) -> Self {
        Self {
            registry,
            store,
            storage,
        }
    }

    /// Validate and enqueue a batch of conversion requests.
    ///
    /// Every request's pair must resolve before any job is created: one
    /// infeasible request rejects the whole batch, so no partial job ever
    /// exists. Returns as soon as the Pending job is persisted; execution
    /// happens on an independent task.
    pub fn submit(&self, requests: Vec<ConversionRequest>) -> Result<JobId> {
        if requests.is_empty() {
            return Err(Error::Validation(
                "no conversion requests provided".to_string(),
            ));
        }

        let mut resolutions = Vec::with_capacity(requests.len());
        for request in &requests {
            resolutions.push(resolver::resolve(
                &self.registry,
                &request.source_format,
                &request.target_format,
            )?);
        }

        let job = Job::new(requests);
        let id = job.id;
        let files = job.requests.len();
        self.store.put(job);
        tracing::info!(job_id = %id, files, "Job submitted");

        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_job(id, resolutions).await });

        Ok(id)
    }

    /// Snapshot of a job's current state.
    pub fn status(&self, id: JobId) -> Result<Job> {
        self.store
            .get(id)
            .ok_or_else(|| Error::not_found("job", id))
    }

    async fn run_job(&self, id: JobId, resolutions: Vec<Resolution>) {
        let Some(job) = self.store.get(id) else {
            tracing::warn!(job_id = %id, "Job disappeared before execution");
            return;
        };

        self.store.update(id, &mut |job| job.begin());

        // Requests run strictly in order; each outcome is appended on its own
        // so pollers observe monotonic progress.
        for (request, resolution) in job.requests.iter().zip(resolutions) {
            match self.run_request(id, request, resolution).await {
                Ok(outcome) => {
                    self.store
                        .update(id, &mut |job| job.record_outcome(outcome.clone()));
                }
                Err(error) => {
                    // The execution context itself cannot continue. Outcomes
                    // gathered so far are preserved.
                    tracing::error!(job_id = %id, %error, "Job execution failed");
                    let message = error.to_string();
                    self.store.update(id, &mut |job| job.fail(&message));
                    return;
                }
            }
        }

        tracing::info!(job_id = %id, "Job finished");
    }

    /// Run one conversion, absorbing every adapter failure into a failed
    /// outcome. `Err` is reserved for orchestration-level failures.
    async fn run_request(
        &self,
        id: JobId,
        request: &ConversionRequest,
        resolution: Resolution,
    ) -> Result<ConversionOutcome> {
        let Some(backend) = self.registry.backend(resolution.family).cloned() else {
            return Err(Error::Internal(format!(
                "no backend registered for family {}",
                resolution.family
            )));
        };

        let (display_name, output_path) = self.storage.converted_target(
            id,
            &request.original_filename,
            &request.target_format,
            resolution.shape,
        );

        tracing::debug!(
            job_id = %id,
            file = %request.original_filename,
            from = %request.source_format,
            to = %request.target_format,
            "Converting"
        );

        // The adapter call is the only blocking operation; it runs on the
        // blocking pool so submission and status polls stay responsive.
        let input = request.source.clone();
        let output = output_path.clone();
        let source_format = request.source_format.clone();
        let target_format = request.target_format.clone();
        let options = request.options.clone();
        let shape = resolution.shape;

        let converted = tokio::task::spawn_blocking(move || {
            backend.convert(&ConvertTask {
                input: &input,
                output: &output,
                source_format: &source_format,
                target_format: &target_format,
                shape,
                options: &options,
            })
        })
        .await
        .map_err(|e| Error::Internal(format!("conversion task failed: {e}")))?;

        let outcome = match converted {
            Ok(()) => {
                // "Output exists and is nonzero" is the success signal.
                match self.storage.size_of(&output_path) {
                    Some(size) if size > 0 => ConversionOutcome::success(
                        request.original_filename.as_str(),
                        display_name,
                        output_path,
                        size,
                    ),
                    _ => {
                        self.storage.delete(&output_path);
                        ConversionOutcome::failure(
                            request.original_filename.as_str(),
                            "converter reported success but produced no output",
                        )
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %id,
                    file = %request.original_filename,
                    error = %e,
                    "Conversion failed"
                );
                ConversionOutcome::failure(request.original_filename.as_str(), e.to_string())
            }
        };

        Ok(outcome)
    }
}
