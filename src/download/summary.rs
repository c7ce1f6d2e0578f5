//! Download summary.
//!
//! # Examples
//!
//! ```rust
//! use shardload::download::{Download, Summary};
//! use shardload::job::JobStatus;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let download = Download::try_from("https://example.com/file.zip")?;
//! let summary = Summary::new(download, 2048).with_status(JobStatus::Finished);
//!
//! println!("{}: {} bytes, {}", summary.download().filename, summary.size(), summary.status());
//! # Ok(())
//! # }
//! ```

use super::download::Download;
use crate::error::Error;
use crate::job::{JobStatus, SchedulerReport};

/// Represents a [`Download`] summary.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Downloaded item.
    download: Download,
    /// Final job status.
    status: JobStatus,
    /// File size in bytes.
    size: u64,
    /// Chunks transferred by this run.
    downloaded_chunks: usize,
    /// Bytes transferred by this run.
    downloaded_bytes: u64,
    /// Chunks reused from a previous run.
    resumed_chunks: usize,
}

impl Summary {
    /// Create a new [`Download`] [`Summary`].
    pub fn new(download: Download, size: u64) -> Self {
        Self {
            download,
            status: JobStatus::Pending,
            size,
            downloaded_chunks: 0,
            downloaded_bytes: 0,
            resumed_chunks: 0,
        }
    }

    /// Attach a status to a [`Download`] [`Summary`].
    pub fn with_status(self, status: JobStatus) -> Self {
        Self { status, ..self }
    }

    /// Record what the chunk scheduler transferred.
    pub fn with_report(self, report: SchedulerReport, resumed_chunks: usize) -> Self {
        Self {
            downloaded_chunks: report.downloaded_chunks,
            downloaded_bytes: report.downloaded_bytes,
            resumed_chunks,
            ..self
        }
    }

    /// Mark the summary as failed or cancelled after `error`.
    pub fn fail(self, error: &Error) -> Self {
        self.with_status(JobStatus::from_error(error))
    }

    /// Mark the summary as skipped with a message.
    pub fn skip(self, msg: impl std::fmt::Display) -> Self {
        self.with_status(JobStatus::Skipped(msg.to_string()))
    }

    /// Get the summary's size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get a reference to the summary's download.
    pub fn download(&self) -> &Download {
        &self.download
    }

    /// Get a reference to the summary's status.
    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn downloaded_chunks(&self) -> usize {
        self.downloaded_chunks
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }

    pub fn resumed_chunks(&self) -> usize {
        self.resumed_chunks
    }

    /// Whether the destination holds the complete file.
    pub fn is_success(&self) -> bool {
        matches!(self.status, JobStatus::Finished | JobStatus::Skipped(_))
    }
}
