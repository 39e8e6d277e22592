use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{convert, ConversionRequest, ConversionResult};
use crate::codec::Codec;

/// Cooperative cancellation flag, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a batch: Idle -> Running -> Completed | Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Failures that stop a batch before any file is converted
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Aggregated outcome of one batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total_count: usize,
    pub succeeded: Vec<ConversionResult>,
    pub failed: Vec<ConversionResult>,
    pub state: BatchState,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn new(total_count: usize) -> Self {
        Self {
            total_count,
            succeeded: Vec::new(),
            failed: Vec::new(),
            state: BatchState::Running,
            elapsed: Duration::ZERO,
        }
    }

    pub fn record(&mut self, result: ConversionResult) {
        if result.is_success() {
            self.succeeded.push(result);
        } else {
            self.failed.push(result);
        }
    }

    /// Files that produced a result, successful or not
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Requests never started because the batch was cancelled
    pub fn skipped(&self) -> usize {
        self.total_count - self.processed()
    }

    pub fn all_succeeded(&self) -> bool {
        self.state == BatchState::Completed && self.failed.is_empty()
    }

    /// Percentage of processed files that converted
    pub fn success_rate(&self) -> f64 {
        if self.processed() == 0 {
            0.0
        } else {
            (self.succeeded.len() as f64 / self.processed() as f64) * 100.0
        }
    }

    /// Distinct directories that received output, in first-written order
    pub fn output_directories(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.succeeded
            .iter()
            .filter_map(|r| r.output_path().and_then(Path::parent))
            .filter(|dir| seen.insert(dir.to_path_buf()))
            .map(Path::to_path_buf)
            .collect()
    }

    pub fn average_duration(&self) -> Duration {
        let processed = self.processed();
        if processed == 0 {
            Duration::ZERO
        } else {
            self.succeeded
                .iter()
                .chain(&self.failed)
                .map(|r| r.duration)
                .sum::<Duration>()
                / processed as u32
        }
    }
}

/// Runs conversion jobs over a list of requests
pub struct BatchRunner<C> {
    codec: C,
    jobs: usize,
}

impl<C: Codec> BatchRunner<C> {
    pub fn new(codec: C) -> Self {
        Self { codec, jobs: 1 }
    }

    /// Number of files converted concurrently; 1 keeps strict request order
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Convert every request, reporting each result through `on_progress`
    ///
    /// `on_progress(index, total, result)` fires right after each file, with
    /// `index` the request's position. With more than one job it is called
    /// from worker threads and results may arrive out of order; the summary
    /// lists stay in request order either way.
    ///
    /// Output directories are created up front; failing that is the only
    /// error. Per-file failures land in `BatchSummary::failed`. Once `cancel`
    /// is set no further file is started and the summary holds what finished.
    pub fn run<F>(
        &self,
        requests: &[ConversionRequest],
        cancel: &CancelToken,
        on_progress: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: Fn(usize, usize, &ConversionResult) + Send + Sync,
    {
        let start = Instant::now();
        let total = requests.len();
        tracing::info!(total, jobs = self.jobs, "starting batch");

        prepare_output_directories(requests)?;

        let mut summary = BatchSummary::new(total);

        if self.jobs == 1 {
            for (index, request) in requests.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                let result = convert(&self.codec, request);
                on_progress(index, total, &result);
                summary.record(result);
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()?;

            let results: Vec<Option<ConversionResult>> = pool.install(|| {
                requests
                    .par_iter()
                    .enumerate()
                    .map(|(index, request)| {
                        if cancel.is_cancelled() {
                            return None;
                        }
                        let result = convert(&self.codec, request);
                        on_progress(index, total, &result);
                        Some(result)
                    })
                    .collect()
            });

            for result in results.into_iter().flatten() {
                summary.record(result);
            }
        }

        summary.state = if summary.processed() < total && cancel.is_cancelled() {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        summary.elapsed = start.elapsed();

        tracing::info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped(),
            state = ?summary.state,
            "batch finished"
        );

        Ok(summary)
    }
}

/// Create each distinct output directory once, before any file is written
fn prepare_output_directories(requests: &[ConversionRequest]) -> Result<(), BatchError> {
    let mut created = HashSet::new();
    for request in requests {
        let dir = &request.output_directory;
        if !created.insert(dir.clone()) {
            continue;
        }
        std::fs::create_dir_all(dir).map_err(|source| BatchError::OutputDirectory {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}
