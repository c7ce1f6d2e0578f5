//! Runs the chunks of one job through a bounded pool of tasks.

use super::job::JobId;
use crate::chunk::{ChunkOutcome, ChunkState, ChunkStatus, ChunkWorker};
use crate::error::{Error, Result};
use crate::resume::{ChunkRecord, ResumeStore};

use indicatif::ProgressBar;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What a scheduler run transferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Chunks completed during this run.
    pub downloaded_chunks: usize,
    /// Bytes of those chunks.
    pub downloaded_bytes: u64,
}

/// Dispatches pending chunks to at most `task_limit` concurrent workers.
///
/// Every status change is written to the resume store before it is acted
/// upon, so a chunk is never considered complete unless its record is.
pub struct TaskScheduler {
    job: JobId,
    worker: Arc<ChunkWorker>,
    store: Arc<dyn ResumeStore>,
    task_limit: usize,
    cancel: CancellationToken,
    progress: ProgressBar,
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("job", &self.job)
            .field("task_limit", &self.task_limit)
            .field("store", &self.store)
            .finish()
    }
}

impl TaskScheduler {
    /// `cancel` must be the token `worker` listens to.
    pub fn new(
        job: JobId,
        worker: ChunkWorker,
        store: Arc<dyn ResumeStore>,
        task_limit: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job,
            worker: Arc::new(worker),
            store,
            task_limit: task_limit.max(1),
            cancel,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report transferred bytes to `progress`.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Drive every non-complete entry of `states` to completion.
    ///
    /// `states` must be indexed by chunk index. On return each entry holds
    /// the last known state of its chunk. The first chunk to run out of
    /// retries, or the first failed save, stops the run: no new chunk is
    /// dispatched, in-flight chunks are cancelled and the error returned.
    #[instrument(skip_all, fields(job = %self.job, chunks = states.len(), tasks = self.task_limit))]
    pub async fn run(&self, states: &mut [ChunkState]) -> Result<SchedulerReport> {
        let mut queue: VecDeque<usize> = states
            .iter()
            .filter(|state| !state.is_complete())
            .map(|state| state.chunk.index)
            .collect();
        debug!(pending = queue.len(), "Scheduling chunks");

        let mut tasks = JoinSet::new();
        let mut failure: Option<Error> = None;
        let mut report = SchedulerReport::default();

        loop {
            while failure.is_none() && !self.cancel.is_cancelled() && tasks.len() < self.task_limit {
                let Some(index) = queue.pop_front() else {
                    break;
                };

                let mut state = states[index].clone();
                state.status = ChunkStatus::InProgress;
                if let Err(e) = self.record(&state).await {
                    self.stop(&mut failure, e);
                    break;
                }
                states[index].status = ChunkStatus::InProgress;

                let worker = self.worker.clone();
                let progress = self.progress.clone();
                tasks.spawn(async move { worker.run(state, &progress).await });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.stop(&mut failure, Error::Internal(format!("chunk task failed: {}", e)));
                    continue;
                }
            };

            let index = outcome.state().chunk.index;
            match outcome {
                ChunkOutcome::Complete(state) => match self.record(&state).await {
                    Ok(()) => {
                        report.downloaded_chunks += 1;
                        report.downloaded_bytes += state.bytes_written;
                        states[index] = state;
                    }
                    Err(e) => {
                        states[index].status = ChunkStatus::Pending;
                        self.stop(&mut failure, e);
                    }
                },
                ChunkOutcome::Retry(state, error) => {
                    warn!(chunk = index, attempt = state.retries, error = %error, "Chunk failed, requeueing");
                    if let Err(e) = self.record(&state).await {
                        states[index] = state;
                        self.stop(&mut failure, e);
                        continue;
                    }
                    states[index] = ChunkState {
                        status: ChunkStatus::Pending,
                        ..state
                    };
                    queue.push_back(index);
                }
                ChunkOutcome::Exhausted(state, error) => {
                    if let Err(e) = self.record(&state).await {
                        warn!(chunk = index, error = %e, "Could not record exhausted chunk");
                    }
                    let attempts = state.retries;
                    states[index] = state;
                    self.stop(
                        &mut failure,
                        Error::RetriesExhausted {
                            index,
                            attempts,
                            source: error,
                        },
                    );
                }
                ChunkOutcome::Cancelled(state) => {
                    if let Err(e) = self.record(&state).await {
                        warn!(chunk = index, error = %e, "Could not record cancelled chunk");
                    }
                    states[index] = state;
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        if self.cancel.is_cancelled() {
            info!("Job cancelled");
            return Err(Error::Cancelled);
        }
        if let Some(state) = states.iter().find(|state| !state.is_complete()) {
            return Err(Error::Incomplete {
                index: state.chunk.index,
            });
        }

        debug!(
            chunks = report.downloaded_chunks,
            bytes = report.downloaded_bytes,
            "All chunks complete"
        );
        Ok(report)
    }

    async fn record(&self, state: &ChunkState) -> Result<()> {
        self.store
            .save(&self.job, state.chunk.index, ChunkRecord::from(state))
            .await
    }

    /// Keep the first error and cancel every in-flight worker.
    fn stop(&self, failure: &mut Option<Error>, error: Error) {
        if failure.is_none() {
            warn!(error = %error, "Stopping job");
            *failure = Some(error);
        }
        self.cancel.cancel();
    }
}
