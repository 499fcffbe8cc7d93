//! Export pipeline
//!
//! Drives a [`DataSource`] page by page, turning each page into a numbered
//! batch that is serialized, staged and uploaded to a [`Sink`].
//!
//! # Scheduling
//!
//! - Sequential: one batch at a time, in ordinal order.
//! - Parallel: the control task keeps reading pages and spawning batch
//!   tasks; at most `concurrency` of them hold a worker permit at once.
//!
//! A failing batch never aborts the run. Its failure is recorded in the
//! [`RunSummary`] and the remaining batches carry on.
//!
//! # Example
//!
//! ```rust,ignore
//! use batch_export::pipeline::{ExportConfig, BatchExportPipeline};
//!
//! let pipeline = BatchExportPipeline::new(sink, serializer)
//!     .with_config(ExportConfig::new().parallel(10));
//! let summary = pipeline.run(&source, "SELECT * FROM users").await?;
//! ```

mod retry;
mod types;


pub use retry::{BackoffType, RetryPolicy};
pub use types::{
    BatchFailure, ExportConfig, ExportResult, FailedBatch, RunOutcome, RunStatus, RunSummary,
};

use crate::error::{BatchErrorKind, Result};
use crate::serialize::PageSerializer;
use crate::sink::{Sink, StagingArea};
use crate::source::{DataSource, PageSource};
use crate::types::{artifact_name, Batch, ScheduleMode};
use futures::FutureExt;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Batch export pipeline
pub struct BatchExportPipeline {
    sink: Arc<dyn Sink>,
    serializer: Arc<dyn PageSerializer>,
    config: ExportConfig,
}

impl BatchExportPipeline {
    /// Create a pipeline with the default config
    pub fn new(sink: Arc<dyn Sink>, serializer: Arc<dyn PageSerializer>) -> Self {
        Self {
            sink,
            serializer,
            config: ExportConfig::default(),
        }
    }

    /// Set the run config
    #[must_use]
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Run config
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export every row `query` yields from `source`
    ///
    /// Fails only when the config is invalid, the staging area cannot be
    /// prepared or the source cannot be opened. Everything after that is
    /// reported through the returned [`RunSummary`].
    pub async fn run<S>(&self, source: &S, query: &str) -> Result<RunSummary>
    where
        S: DataSource + ?Sized,
    {
        self.config.validate()?;

        let started = Instant::now();
        let staging = StagingArea::new(&self.config.staging)?;
        let pages = source.open(query, self.config.page_size)?;

        info!(
            "Starting {} export (page_size={}, concurrency={})",
            self.config.mode, self.config.page_size, self.config.concurrency
        );

        let worker = BatchWorker {
            sink: Arc::clone(&self.sink),
            serializer: Arc::clone(&self.serializer),
            staging: Arc::new(staging),
            prefix: self.config.prefix.clone(),
            retry: self.config.retry.clone(),
        };
        let stop = StopSignal::new(&self.config);

        let mut summary = match self.config.mode {
            ScheduleMode::Sequential => run_sequential(pages, &worker, &stop).await,
            ScheduleMode::Parallel => {
                run_parallel(pages, worker, &stop, self.config.concurrency).await
            }
        };
        summary.finish(started.elapsed());

        match &summary.outcome {
            RunOutcome::Completed => info!(
                "Total {} batches processed in {:.2} seconds ({} succeeded, {} failed, {} records)",
                summary.attempted,
                summary.elapsed.as_secs_f64(),
                summary.succeeded,
                summary.failed(),
                summary.records_exported
            ),
            RunOutcome::Cancelled => warn!(
                "Export cancelled after {:.2} seconds: {} batches submitted, {} finished, {} abandoned",
                summary.elapsed.as_secs_f64(),
                summary.attempted,
                summary.results.len(),
                summary.abandoned.len()
            ),
            RunOutcome::SourceFailed { message } => error!(
                "Export stopped by source failure after {} batches: {message}",
                summary.attempted
            ),
        }

        Ok(summary)
    }
}

/// Caller cancellation combined with the optional run deadline
struct StopSignal {
    token: CancellationToken,
    deadline: Option<tokio::time::Instant>,
}

impl StopSignal {
    fn new(config: &ExportConfig) -> Self {
        Self {
            token: config.cancel.clone(),
            deadline: config.deadline.map(|d| tokio::time::Instant::now() + d),
        }
    }

    fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
            || self
                .deadline
                .is_some_and(|at| tokio::time::Instant::now() >= at)
    }

    async fn stopped(&self) {
        match self.deadline {
            Some(at) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = tokio::time::sleep_until(at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

/// Per-batch work, shared by every batch of a run
#[derive(Clone)]
struct BatchWorker {
    sink: Arc<dyn Sink>,
    serializer: Arc<dyn PageSerializer>,
    staging: Arc<StagingArea>,
    prefix: String,
    retry: RetryPolicy,
}

impl BatchWorker {
    /// Process one batch; panics become a failed result
    async fn process(&self, batch: Batch) -> ExportResult {
        let ordinal = batch.ordinal;
        let records = batch.len();
        let started = Instant::now();

        match AssertUnwindSafe(self.export(batch)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Batch {ordinal} panicked");
                ExportResult::failure(
                    ordinal,
                    artifact_name(ordinal),
                    records,
                    started.elapsed(),
                    BatchFailure {
                        kind: BatchErrorKind::Other,
                        message: "batch task panicked".to_string(),
                    },
                )
            }
        }
    }

    async fn export(&self, batch: Batch) -> ExportResult {
        let started = Instant::now();
        let artifact = batch.artifact_name();
        let object_name = format!("{}{artifact}", self.prefix);
        let records = batch.len();

        debug!("Batch {} started with {records} records", batch.ordinal);

        match self.upload(&batch, &artifact, &object_name).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                info!(
                    "Batch {} exported {records} records to {} in {:.2} seconds",
                    batch.ordinal,
                    self.sink.describe(&object_name),
                    elapsed.as_secs_f64()
                );
                ExportResult::success(batch.ordinal, artifact, records, elapsed)
            }
            Err(e) => {
                error!("Batch {} failed: {e}", batch.ordinal);
                ExportResult::failure(
                    batch.ordinal,
                    artifact,
                    records,
                    started.elapsed(),
                    BatchFailure::from(&e),
                )
            }
        }
    }

    /// Serialize, stage and upload; the staged artifact is released on return
    async fn upload(&self, batch: &Batch, artifact: &str, object_name: &str) -> Result<()> {
        let payload = self.serializer.serialize(&batch.records)?;
        let staged = self.staging.stage(artifact, payload).await?;
        let payload = staged.read().await?;

        self.retry
            .run(object_name, || self.sink.put(object_name, payload.clone()))
            .await
    }
}

/// Pull the next page, mapping a source failure onto the run outcome
fn next_batch<P>(pages: &mut P, ordinal: u64) -> std::result::Result<Option<Batch>, RunOutcome>
where
    P: PageSource + ?Sized,
{
    match pages.next_page() {
        Ok(Some(page)) => Ok(Some(Batch::new(ordinal, page))),
        Ok(None) => Ok(None),
        Err(e) => {
            error!("Failed to read page {ordinal}: {e}");
            Err(RunOutcome::SourceFailed {
                message: e.to_string(),
            })
        }
    }
}

async fn run_sequential(
    mut pages: Box<dyn PageSource>,
    worker: &BatchWorker,
    stop: &StopSignal,
) -> RunSummary {
    let mut summary = RunSummary::new();
    let mut ordinal = 0u64;

    loop {
        if stop.is_stopped() {
            summary.outcome = RunOutcome::Cancelled;
            break;
        }

        let batch = match next_batch(&mut *pages, ordinal) {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(outcome) => {
                summary.outcome = outcome;
                break;
            }
        };
        ordinal += 1;
        summary.attempted += 1;

        let current = batch.ordinal;
        tokio::select! {
            result = worker.process(batch) => summary.record(result),
            () = stop.stopped() => {
                summary.abandoned.push(current);
                summary.outcome = RunOutcome::Cancelled;
                break;
            }
        }
    }

    summary
}

async fn run_parallel(
    mut pages: Box<dyn PageSource>,
    worker: BatchWorker,
    stop: &StopSignal,
    concurrency: usize,
) -> RunSummary {
    let mut summary = RunSummary::new();
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    let mut in_flight = BTreeSet::new();
    let mut ordinal = 0u64;
    let mut cancelled = false;

    // Submission: reading pages never waits on batch completion
    loop {
        if stop.is_stopped() {
            cancelled = true;
            break;
        }

        while let Some(joined) = tasks.try_join_next() {
            collect(&mut summary, &mut in_flight, joined);
        }

        let batch = match next_batch(&mut *pages, ordinal) {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(outcome) => {
                summary.outcome = outcome;
                break;
            }
        };
        ordinal += 1;
        summary.attempted += 1;
        in_flight.insert(batch.ordinal);

        let worker = worker.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // The semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            worker.process(batch).await
        });

        // Let spawned batches start on a single-threaded runtime
        tokio::task::yield_now().await;
    }
    drop(pages);

    // Join barrier, cut short by cancellation
    if !cancelled {
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => collect(&mut summary, &mut in_flight, joined),
                    None => break,
                },
                () = stop.stopped() => {
                    cancelled = true;
                    break;
                }
            }
        }
    }

    if cancelled {
        tasks.abort_all();
        while let Some(joined) = tasks.join_next().await {
            collect(&mut summary, &mut in_flight, joined);
        }
        summary.abandoned = in_flight.into_iter().collect();
        summary.outcome = RunOutcome::Cancelled;
    }

    summary
}

fn collect(
    summary: &mut RunSummary,
    in_flight: &mut BTreeSet<u64>,
    joined: std::result::Result<ExportResult, JoinError>,
) {
    match joined {
        Ok(result) => {
            in_flight.remove(&result.ordinal);
            summary.record(result);
        }
        // Aborted batches stay in flight and are reported as abandoned
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!("Batch task failed to join: {e}"),
    }
}
