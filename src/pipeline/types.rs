//! Pipeline types
//!
//! Run configuration and the per-batch / per-run outcomes.

use super::retry::RetryPolicy;
use crate::error::{BatchErrorKind, Error, Result};
use crate::sink::StagingMode;
use crate::types::ScheduleMode;
use serde::{Serialize, Serializer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for an export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Records per page
    pub page_size: usize,
    /// Maximum batches processed at once in parallel mode
    pub concurrency: usize,
    /// Scheduling mode
    pub mode: ScheduleMode,
    /// Prepended verbatim to every artifact name
    pub prefix: String,
    /// Cancel the run once this much time has passed
    pub deadline: Option<Duration>,
    /// Upload retries
    pub retry: RetryPolicy,
    /// Where payloads wait between serialization and upload
    pub staging: StagingMode,
    /// Caller-side cancellation
    pub cancel: CancellationToken,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            concurrency: 10,
            mode: ScheduleMode::Parallel,
            prefix: "bq_exports/".to_string(),
            deadline: None,
            retry: RetryPolicy::default(),
            staging: StagingMode::Memory,
            cancel: CancellationToken::new(),
        }
    }
}

impl ExportConfig {
    /// Create a new export config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Set worker count
    #[must_use]
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    /// Set scheduling mode
    #[must_use]
    pub fn with_mode(mut self, mode: ScheduleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run sequentially
    #[must_use]
    pub fn sequential(self) -> Self {
        self.with_mode(ScheduleMode::Sequential)
    }

    /// Run on a bounded worker pool of `workers`
    #[must_use]
    pub fn parallel(self, workers: usize) -> Self {
        self.with_mode(ScheduleMode::Parallel).with_concurrency(workers)
    }

    /// Set artifact prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set run deadline
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set staging mode
    #[must_use]
    pub fn with_staging(mut self, staging: StagingMode) -> Self {
        self.staging = staging;
        self
    }

    /// Set cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::config("page_size must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be greater than zero"));
        }
        Ok(())
    }
}

/// Why a batch failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Failure class
    pub kind: BatchErrorKind,
    /// Error message
    pub message: String,
}

impl From<&Error> for BatchFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.batch_kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one batch
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    /// Batch ordinal
    pub ordinal: u64,
    /// Artifact name (`batch_{ordinal}.json`)
    pub artifact: String,
    /// Records in the batch
    pub records: usize,
    /// Time spent on the batch
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    /// Set when the batch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchFailure>,
}

impl ExportResult {
    /// Successful batch
    pub fn success(ordinal: u64, artifact: String, records: usize, elapsed: Duration) -> Self {
        Self {
            ordinal,
            artifact,
            records,
            elapsed,
            error: None,
        }
    }

    /// Failed batch
    pub fn failure(
        ordinal: u64,
        artifact: String,
        records: usize,
        elapsed: Duration,
        error: BatchFailure,
    ) -> Self {
        Self {
            ordinal,
            artifact,
            records,
            elapsed,
            error: Some(error),
        }
    }

    /// Whether the batch was uploaded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A failed batch in the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBatch {
    /// Batch ordinal
    pub ordinal: u64,
    /// Failure class
    pub kind: BatchErrorKind,
    /// Error message
    pub message: String,
}

/// How a run ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every page was read and every batch accounted for
    #[default]
    Completed,
    /// Cancelled by the caller or the deadline
    Cancelled,
    /// The source failed mid-run
    SourceFailed {
        /// Source error message
        message: String,
    },
}

/// Coarse run status, one per process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every batch succeeded
    Success,
    /// The run completed but at least one batch failed
    PartialFailure,
    /// The run was aborted by a fatal error
    Fatal,
    /// The run was cancelled
    Cancelled,
}

/// Aggregate outcome of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Batches submitted
    pub attempted: usize,
    /// Batches uploaded
    pub succeeded: usize,
    /// Records in uploaded batches
    pub records_exported: usize,
    /// Wall-clock time of the run
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    /// How the run ended
    pub outcome: RunOutcome,
    /// Failed batches, by ordinal
    pub failures: Vec<FailedBatch>,
    /// Batches abandoned by cancellation, by ordinal
    pub abandoned: Vec<u64>,
    /// Per-batch results in completion order
    pub results: Vec<ExportResult>,
}

impl RunSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch result
    pub fn record(&mut self, result: ExportResult) {
        match &result.error {
            None => {
                self.succeeded += 1;
                self.records_exported += result.records;
            }
            Some(failure) => self.failures.push(FailedBatch {
                ordinal: result.ordinal,
                kind: failure.kind,
                message: failure.message.clone(),
            }),
        }
        self.results.push(result);
    }

    /// Number of failed batches
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Ordinals of uploaded batches, sorted
    pub fn succeeded_ordinals(&self) -> Vec<u64> {
        let mut ordinals: Vec<u64> = self
            .results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.ordinal)
            .collect();
        ordinals.sort_unstable();
        ordinals
    }

    /// Coarse status of the run
    pub fn status(&self) -> RunStatus {
        match self.outcome {
            RunOutcome::Cancelled => RunStatus::Cancelled,
            RunOutcome::SourceFailed { .. } => RunStatus::Fatal,
            RunOutcome::Completed if self.failures.is_empty() => RunStatus::Success,
            RunOutcome::Completed => RunStatus::PartialFailure,
        }
    }

    /// Whether the run completed and every batch succeeded
    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Success
    }

    /// Turn a cancelled or source-failed run into its error
    pub fn into_result(self) -> Result<Self> {
        match &self.outcome {
            RunOutcome::Completed => Ok(self),
            RunOutcome::Cancelled => Err(Error::RunCancelled {
                attempted: self.attempted,
                completed: self.results.len(),
            }),
            RunOutcome::SourceFailed { message } => Err(Error::source_error(message.clone())),
        }
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        self.failures.sort_by_key(|f| f.ordinal);
        self.abandoned.sort_unstable();
    }
}

fn as_secs_f64<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
