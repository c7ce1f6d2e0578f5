//! One dispatch of one chunk: request its range, stream it to its part
//! artifact, and report how the attempt ended.

use super::planner::{ChunkState, ChunkStatus};
use crate::chunk::Chunk;
use crate::error::TransferError;
use crate::http::Transport;
use crate::sink::ChunkSink;

use indicatif::ProgressBar;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Exponential delay between two attempts at the same chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound of any delay.
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            max: Duration::from_secs(8),
        }
    }
}

impl Backoff {
    /// Delay before the attempt following `retries` failures.
    ///
    /// `base * 2^(retries - 1)`, capped at `max`. Zero for a first attempt.
    pub fn delay(&self, retries: u32) -> Duration {
        if retries == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retries - 1).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

/// How a dispatch of a chunk ended.
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Every byte is in the part artifact.
    Complete(ChunkState),
    /// The attempt failed and the chunk may be attempted again.
    Retry(ChunkState, TransferError),
    /// The attempt failed and no retries are left.
    Exhausted(ChunkState, TransferError),
    /// The job was cancelled while the chunk was in flight.
    Cancelled(ChunkState),
}

impl ChunkOutcome {
    pub fn state(&self) -> &ChunkState {
        match self {
            ChunkOutcome::Complete(state)
            | ChunkOutcome::Retry(state, _)
            | ChunkOutcome::Exhausted(state, _)
            | ChunkOutcome::Cancelled(state) => state,
        }
    }
}

/// Downloads chunks of one job. Shared by every task of the job.
#[derive(Debug, Clone)]
pub struct ChunkWorker {
    transport: Transport,
    sink: Arc<dyn ChunkSink>,
    url: Url,
    total_size: u64,
    retry_attempts: u32,
    backoff: Backoff,
    write_timeout: Duration,
    cancel: CancellationToken,
}

impl ChunkWorker {
    pub fn new(
        transport: Transport,
        sink: Arc<dyn ChunkSink>,
        url: Url,
        total_size: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            sink,
            url,
            total_size,
            retry_attempts: 0,
            backoff: Backoff::default(),
            write_timeout: Duration::from_secs(60),
            cancel,
        }
    }

    /// Failed attempts tolerated per chunk before the job fails.
    pub fn retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Deadline of a single write to the part artifact.
    pub fn write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Run one dispatch of `state`.
    ///
    /// Bytes are added to `progress` as they are written and taken back if
    /// the attempt does not complete.
    pub async fn run(&self, mut state: ChunkState, progress: &ProgressBar) -> ChunkOutcome {
        let index = state.chunk.index;

        if state.retries > 0 {
            let delay = self.backoff.delay(state.retries);
            debug!(chunk = index, attempt = state.retries + 1, ?delay, "Waiting before retry");
            tokio::select! {
                _ = self.cancel.cancelled() => return Self::cancelled(state),
                _ = sleep(delay) => {}
            }
        }
        if self.cancel.is_cancelled() {
            return Self::cancelled(state);
        }

        state.status = ChunkStatus::InProgress;
        state.bytes_written = 0;
        state.checksum = None;

        let mut added = 0u64;
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.attempt(&state.chunk, progress, &mut added) => Some(result),
        };

        match result {
            Some(Ok((written, checksum))) => {
                debug!(chunk = index, bytes = written, "Chunk complete");
                state.status = ChunkStatus::Complete;
                state.bytes_written = written;
                state.checksum = Some(checksum);
                ChunkOutcome::Complete(state)
            }
            Some(Err(error)) => {
                progress.dec(added);
                state.status = ChunkStatus::Failed;
                state.bytes_written = added;
                state.retries += 1;
                if state.retries > self.retry_attempts {
                    warn!(chunk = index, attempts = state.retries, error = %error, "Chunk out of retries");
                    ChunkOutcome::Exhausted(state, error)
                } else {
                    debug!(chunk = index, attempt = state.retries, error = %error, "Chunk attempt failed");
                    ChunkOutcome::Retry(state, error)
                }
            }
            None => {
                progress.dec(added);
                Self::cancelled(state)
            }
        }
    }

    fn cancelled(mut state: ChunkState) -> ChunkOutcome {
        debug!(chunk = state.chunk.index, "Chunk cancelled");
        state.status = ChunkStatus::Pending;
        state.bytes_written = 0;
        state.checksum = None;
        ChunkOutcome::Cancelled(state)
    }

    /// Transfer the chunk once, returning the byte count and CRC32.
    async fn attempt(
        &self,
        chunk: &Chunk,
        progress: &ProgressBar,
        added: &mut u64,
    ) -> Result<(u64, u32), TransferError> {
        if chunk.is_empty() {
            let writer = self.sink.writer(chunk).await.map_err(TransferError::Write)?;
            return writer.finish().await.map_err(TransferError::Write);
        }

        let mut response = self
            .transport
            .fetch_range(&self.url, chunk, self.total_size)
            .await?;
        let mut writer = self.sink.writer(chunk).await.map_err(TransferError::Write)?;
        let expected = chunk.len();

        while let Some(bytes) = response.next_bytes().await? {
            let len = bytes.len() as u64;
            if writer.written() + len > expected {
                return Err(TransferError::Length {
                    expected,
                    actual: writer.written() + len,
                });
            }
            timeout(self.write_timeout, writer.write(&bytes))
                .await
                .map_err(|_| self.write_elapsed(chunk))?
                .map_err(TransferError::Write)?;
            progress.inc(len);
            *added += len;
        }

        if writer.written() != expected {
            return Err(TransferError::Length {
                expected,
                actual: writer.written(),
            });
        }

        timeout(self.write_timeout, writer.finish())
            .await
            .map_err(|_| self.write_elapsed(chunk))?
            .map_err(TransferError::Write)
    }

    fn write_elapsed(&self, chunk: &Chunk) -> TransferError {
        TransferError::Timeout(format!(
            "writing chunk {} took longer than {:?}",
            chunk.index, self.write_timeout
        ))
    }
}
