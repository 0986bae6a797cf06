use alembic_common::{ConversionOutcome, ConversionRequest, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// The unit of orchestration: one batch of conversion requests submitted
/// together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Requests in submission order; outcomes are appended in the same order.
    pub requests: Vec<ConversionRequest>,
    pub state: JobState,
    /// 0-100, monotonically non-decreasing while processing.
    pub progress: u8,
    pub outcomes: Vec<ConversionOutcome>,
    /// Set only on an orchestration-level failure; an individual failed
    /// request is recorded in its outcome instead.
    pub error: Option<String>,
    /// Used solely for retention.
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(requests: Vec<ConversionRequest>) -> Self {
        Self {
            id: JobId::new(),
            requests,
            state: JobState::Pending,
            progress: 0,
            outcomes: Vec::new(),
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Execution has begun.
    pub fn begin(&mut self) {
        if self.state == JobState::Pending {
            self.state = JobState::Processing;
        }
    }

    /// Append the outcome for the next request and advance progress.
    ///
    /// Completes the job once every request has an outcome, regardless of
    /// individual success: "completed" means "finished attempting".
    pub fn record_outcome(&mut self, outcome: ConversionOutcome) {
        if self.is_terminal() {
            return;
        }
        self.outcomes.push(outcome);
        let total = self.requests.len().max(1);
        self.progress = ((100 * self.outcomes.len() / total).min(100)) as u8;
        if self.outcomes.len() >= self.requests.len() {
            self.state = JobState::Completed;
            self.progress = 100;
        }
    }

    /// Orchestration-level failure; preserves outcomes gathered so far.
    pub fn fail(&mut self, error: &str) {
        self.state = JobState::Failed;
        self.error = Some(error.to_string());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Completed | JobState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alembic_common::{ConvertOptions, FormatToken};
    use std::path::PathBuf;

    fn request(name: &str) -> ConversionRequest {
        ConversionRequest {
            source: PathBuf::from(format!("/tmp/{name}")),
            original_filename: name.to_string(),
            source_format: FormatToken::new("txt"),
            target_format: FormatToken::new("html"),
            options: ConvertOptions::default(),
        }
    }

    #[test]
    fn progress_is_floored_and_monotonic() {
        let mut job = Job::new(vec![request("a"), request("b"), request("c")]);
        job.begin();
        assert_eq!(job.state, JobState::Processing);
        assert_eq!(job.progress, 0);

        job.record_outcome(ConversionOutcome::failure("a", "boom"));
        assert_eq!(job.progress, 33);
        assert_eq!(job.state, JobState::Processing);

        job.record_outcome(ConversionOutcome::failure("b", "boom"));
        assert_eq!(job.progress, 66);

        job.record_outcome(ConversionOutcome::failure("c", "boom"));
        assert_eq!(job.progress, 100);
        // Individual failures never fail the job.
        assert_eq!(job.state, JobState::Completed);
        assert!(job.error.is_none());
    }

    #[test]
    fn fail_preserves_gathered_outcomes() {
        let mut job = Job::new(vec![request("a"), request("b")]);
        job.begin();
        job.record_outcome(ConversionOutcome::failure("a", "boom"));
        job.fail("executor crashed");

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.outcomes.len(), 1);
        assert_eq!(job.error.as_deref(), Some("executor crashed"));
    }

    #[test]
    fn terminal_jobs_ignore_further_outcomes() {
        let mut job = Job::new(vec![request("a")]);
        job.begin();
        job.record_outcome(ConversionOutcome::failure("a", "boom"));
        assert!(job.is_terminal());

        job.record_outcome(ConversionOutcome::failure("ghost", "late"));
        assert_eq!(job.outcomes.len(), 1);
    }

    #[test]
    fn begin_only_transitions_from_pending() {
        let mut job = Job::new(vec![request("a")]);
        job.fail("early crash");
        job.begin();
        assert_eq!(job.state, JobState::Failed);
    }
}
