//! Configuration of a [`Downloader`](super::Downloader) and its defaults.
//!
//! # Examples
//!
//! ```rust
//! use shardload::downloader::DownloadCallback;
//! use shardload::download::Summary;
//! use shardload::job::JobStatus;
//!
//! let callback: DownloadCallback = Box::new(|summary: &Summary| match summary.status() {
//!     JobStatus::Finished => println!("✓ {}", summary.download().filename),
//!     JobStatus::Failed(reason) => println!("✗ {}: {}", summary.download().filename, reason.message),
//!     other => println!("{}: {}", summary.download().filename, other),
//! });
//! ```

use crate::chunk::Backoff;
use crate::download::Summary;
use crate::http::{PoolLimits, Timeouts, DEFAULT_HTTP_RETRIES};
use crate::presets::{DEFAULT_CHUNK_SIZE, DEFAULT_RETRY_ATTEMPTS, DEFAULT_TASKS};
use crate::resume::ResumeStore;
use crate::sink::DownloadMode;
use crate::StyleOptions;

use reqwest::header::HeaderMap;
use std::env::current_dir;
use std::path::PathBuf;
use std::sync::Arc;

/// Callback type for download completion events
pub type DownloadCallback = Box<dyn Fn(&Summary) + Send + Sync>;

/// Configuration structure for the downloader
#[derive(Clone)]
pub struct DownloaderConfig {
    /// Directory where to store the downloaded files.
    pub directory: PathBuf,
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Concurrent chunk tasks per file.
    pub task_limit: usize,
    /// Failed attempts tolerated per chunk before the file fails.
    pub retry_attempts: u32,
    /// Transport-level retries inside a single chunk attempt.
    pub transport_retries: u32,
    /// Number of files downloaded at the same time.
    pub concurrent_downloads: usize,
    /// Delay between attempts at the same chunk.
    pub backoff: Backoff,
    pub timeouts: Timeouts,
    pub limits: PoolLimits,
    /// Layout of the part artifacts.
    pub mode: DownloadMode,
    /// Downloader style options.
    pub style_options: StyleOptions,
    /// Reuse chunks completed by a previous run.
    pub resumable: bool,
    /// Re-check the bytes of resumed chunks against their checksum.
    pub verify_parts: bool,
    /// Custom HTTP headers.
    pub headers: Option<HeaderMap>,
    /// Use range requests to get content length instead of HEAD requests.
    pub use_range_for_content_length: bool,
    /// Hide main progress bar for single file downloads.
    pub single_file_progress: bool,
    /// Callback for when each download completes.
    pub on_complete: Option<Arc<DownloadCallback>>,
    /// Force download and overwrite existing files.
    pub overwrite: bool,
    /// Directory of the resume documents. Defaults to `directory`.
    pub state_dir: Option<PathBuf>,
    /// Replaces the JSON resume store.
    pub resume_store: Option<Arc<dyn ResumeStore>>,
}

impl DownloaderConfig {
    pub(crate) fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| self.directory.clone())
    }
}

impl std::fmt::Debug for DownloaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderConfig")
            .field("directory", &self.directory)
            .field("chunk_size", &self.chunk_size)
            .field("task_limit", &self.task_limit)
            .field("retry_attempts", &self.retry_attempts)
            .field("transport_retries", &self.transport_retries)
            .field("concurrent_downloads", &self.concurrent_downloads)
            .field("backoff", &self.backoff)
            .field("timeouts", &self.timeouts)
            .field("limits", &self.limits)
            .field("mode", &self.mode)
            .field("style_options", &self.style_options)
            .field("resumable", &self.resumable)
            .field("verify_parts", &self.verify_parts)
            .field("headers", &self.headers)
            .field(
                "use_range_for_content_length",
                &self.use_range_for_content_length,
            )
            .field("single_file_progress", &self.single_file_progress)
            .field("on_complete", &self.on_complete.is_some())
            .field("overwrite", &self.overwrite)
            .field("state_dir", &self.state_dir)
            .field("resume_store", &self.resume_store)
            .finish()
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            directory: current_dir().unwrap_or_default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            task_limit: DEFAULT_TASKS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            transport_retries: DEFAULT_HTTP_RETRIES,
            concurrent_downloads: 4,
            backoff: Backoff::default(),
            timeouts: Timeouts::default(),
            limits: PoolLimits::default(),
            mode: DownloadMode::default(),
            style_options: StyleOptions::default(),
            resumable: true,
            verify_parts: false,
            headers: None,
            use_range_for_content_length: false,
            single_file_progress: false,
            on_complete: None,
            overwrite: false,
            state_dir: None,
            resume_store: None,
        }
    }
}
