use crate::error::{Error, FailureReason};
use crate::presets::DownloadStatus;

use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Stable identity of a job, derived from its destination file name.
///
/// Two runs targeting the same destination share an id, which is what
/// lets the second run find the resume state of the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Id of the job writing to `destination`.
    pub fn for_destination(destination: &Path) -> Self {
        let name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| destination.to_string_lossy().into_owned());
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Created, not started.
    Pending,
    /// Probing, transferring or assembling.
    Downloading,
    /// The destination holds the complete file.
    Finished,
    /// The job stopped on an error.
    Failed(FailureReason),
    /// The job was cancelled by its owner.
    Cancelled,
    /// Nothing to do, with the reason.
    Skipped(String),
}

impl JobStatus {
    /// Whether the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Downloading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => DownloadStatus::Downloading.as_str(),
            JobStatus::Finished => DownloadStatus::Finished.as_str(),
            JobStatus::Failed(_) => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Skipped(_) => "skipped",
        }
    }

    /// Terminal status matching the result of a run.
    pub(crate) fn from_error(error: &Error) -> Self {
        match error {
            Error::Cancelled => JobStatus::Cancelled,
            error => JobStatus::Failed(FailureReason::from(error)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Shared {
    status: watch::Sender<JobStatus>,
    total_size: OnceLock<u64>,
    cancel: CancellationToken,
}

/// Handle to one file download.
///
/// Clones observe and control the same job. The status can be read at
/// any time and moves to a terminal state exactly once.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    id: JobId,
    url: Url,
    destination: PathBuf,
    hash: Option<String>,
    chunk_size: u64,
    task_limit: usize,
    retry_attempts: u32,
    shared: Arc<Shared>,
}

impl DownloadJob {
    pub fn new(
        url: Url,
        destination: PathBuf,
        chunk_size: u64,
        task_limit: usize,
        retry_attempts: u32,
    ) -> Self {
        let (status, _) = watch::channel(JobStatus::Pending);
        Self {
            id: JobId::for_destination(&destination),
            url,
            destination,
            hash: None,
            chunk_size,
            task_limit: task_limit.max(1),
            retry_attempts,
            shared: Arc::new(Shared {
                status,
                total_size: OnceLock::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Expected MD5 or CRC32 of the finished file.
    pub fn with_hash(mut self, hash: Option<String>) -> Self {
        self.hash = hash;
        self
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn task_limit(&self) -> usize {
        self.task_limit
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Size of the remote resource, once known.
    pub fn total_size(&self) -> Option<u64> {
        self.shared.total_size.get().copied()
    }

    pub(crate) fn set_total_size(&self, total_size: u64) {
        let _ = self.shared.total_size.set(total_size);
    }

    pub fn status(&self) -> JobStatus {
        self.shared.status.borrow().clone()
    }

    /// Watch status changes.
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.shared.status.subscribe()
    }

    /// Request cancellation. In-flight chunk requests are aborted and
    /// their parts left for a later resume.
    pub fn cancel(&self) {
        debug!(job = %self.id, "Cancellation requested");
        self.shared.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    /// Move to `status`.
    ///
    /// Returns `false`, leaving the status untouched, when the job already
    /// reached a terminal state.
    pub(crate) fn transition(&self, status: JobStatus) -> bool {
        self.shared.status.send_if_modified(|current| {
            if current.is_terminal() || *current == status {
                return false;
            }
            debug!(job = %self.id, from = %current, to = %status, "Job status changed");
            *current = status;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn job() -> DownloadJob {
        let url = Url::parse("https://example.com/video/movie.mp4").unwrap();
        DownloadJob::new(url, PathBuf::from("/tmp/out/movie.mp4"), 1024, 0, 2)
    }

    #[test]
    fn test_id_comes_from_file_name() {
        let job = job();
        assert_eq!(job.id().as_str(), "movie.mp4");
        assert_eq!(job.task_limit(), 1);
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let job = job();
        let observer = job.clone();

        assert!(job.transition(JobStatus::Downloading));
        assert_eq!(observer.status().to_string(), "downloading");
        assert!(job.transition(JobStatus::Finished));
        assert_eq!(observer.status().to_string(), "finished");

        assert!(!job.transition(JobStatus::Cancelled));
        assert!(!job.transition(JobStatus::Downloading));
        assert_eq!(observer.status(), JobStatus::Finished);
    }

    #[test]
    fn test_failed_status_keeps_reason() {
        let job = job();
        job.transition(JobStatus::from_error(&Error::SizeMismatch {
            expected: 10,
            actual: 9,
        }));
        match job.status() {
            JobStatus::Failed(reason) => assert_eq!(reason.kind, FailureKind::SizeMismatch),
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(JobStatus::from_error(&Error::Cancelled), JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let job = job();
        let mut rx = job.subscribe();
        job.transition(JobStatus::Downloading);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), JobStatus::Downloading);
    }

    #[test]
    fn test_cancel_is_shared() {
        let job = job();
        job.clone().cancel();
        assert!(job.is_cancelled());
        assert!(job.cancel_token().is_cancelled());
    }
}
