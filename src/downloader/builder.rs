//! Builder for [`Downloader`] instances.
//!
//! # Examples
//!
//! ```rust
//! use shardload::downloader::DownloaderBuilder;
//! use shardload::sink::DownloadMode;
//! use std::path::PathBuf;
//!
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("./downloads"))
//!     .chunk_size(8 * 1024 * 1024)
//!     .task_limit(8)
//!     .retry_attempts(3)
//!     .mode(DownloadMode::SingleFile)
//!     .build();
//! ```
//!
//! ## Hidden Progress Bars
//!
//! ```rust
//! use shardload::downloader::DownloaderBuilder;
//!
//! let downloader = DownloaderBuilder::hidden().build();
//! ```

use super::{config::DownloaderConfig, downloader::Downloader};
use crate::chunk::Backoff;
use crate::download::Summary;
use crate::http::{PoolLimits, Timeouts};
use crate::resume::ResumeStore;
use crate::sink::DownloadMode;
use crate::{ProgressBarOpts, StyleOptions};

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::{path::PathBuf, sync::Arc};

/// A builder used to create a [`Downloader`].
///
/// ```rust
/// use shardload::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().retry_attempts(5).directory("downloads".into()).build();
/// ```
#[derive(Default)]
pub struct DownloaderBuilder {
    config: DownloaderConfig,
}

impl DownloaderBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloaderBuilder::default()
    }

    /// Convenience function to hide the progress bars.
    pub fn hidden() -> Self {
        let mut builder = DownloaderBuilder::default();
        builder.config.style_options =
            StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden());
        builder
    }

    /// Sets the directory where to store the downloads.
    pub fn directory(mut self, directory: PathBuf) -> Self {
        self.config.directory = directory;
        self
    }

    /// Bytes per chunk. Zero makes every download fail with
    /// [`Error::InvalidSize`](crate::Error::InvalidSize).
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Concurrent chunk tasks per file.
    pub fn task_limit(mut self, task_limit: usize) -> Self {
        self.config.task_limit = task_limit;
        self
    }

    /// Failed attempts tolerated per chunk. A chunk is requested at most
    /// `retry_attempts + 1` times before its file fails.
    pub fn retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.config.retry_attempts = retry_attempts;
        self
    }

    /// Transport-level retries (connect errors, transient statuses) inside
    /// a single chunk attempt.
    pub fn transport_retries(mut self, retries: u32) -> Self {
        self.config.transport_retries = retries;
        self
    }

    /// Set the number of files downloaded at the same time.
    pub fn concurrent_downloads(mut self, concurrent_downloads: usize) -> Self {
        self.config.concurrent_downloads = concurrent_downloads;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    pub fn limits(mut self, limits: PoolLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Layout of the part artifacts on disk.
    pub fn mode(mut self, mode: DownloadMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the downloader style options.
    pub fn style_options(mut self, style_options: StyleOptions) -> Self {
        self.config.style_options = style_options;
        self
    }

    /// Reuse chunks completed by a previous run. When disabled, every run
    /// starts from scratch.
    pub fn resumable(mut self, resumable: bool) -> Self {
        self.config.resumable = resumable;
        self
    }

    /// Re-read resumed parts and compare them with their recorded checksum
    /// before trusting them.
    pub fn verify_parts(mut self, verify: bool) -> Self {
        self.config.verify_parts = verify;
        self
    }

    /// Use range requests to get content length instead of HEAD requests.
    ///
    /// This is useful when servers don't provide accurate Content-Length headers
    /// in HEAD requests but do support range requests with Content-Range responses.
    pub fn use_range_for_content_length(mut self, use_range: bool) -> Self {
        self.config.use_range_for_content_length = use_range;
        self
    }

    /// Hide the main progress bar when downloading a single file.
    pub fn single_file_progress(mut self, single_file: bool) -> Self {
        self.config.single_file_progress = single_file;
        self
    }

    /// Set callback for when each download completes.
    ///
    /// The callback is called as soon as each download reaches its final
    /// status, regardless of whether other downloads are still running.
    ///
    /// ```rust
    /// use shardload::downloader::DownloaderBuilder;
    /// use shardload::job::JobStatus;
    ///
    /// let downloader = DownloaderBuilder::new()
    ///     .on_complete(|summary| match summary.status() {
    ///         JobStatus::Finished => println!("[Finished] {}", summary.download().filename),
    ///         JobStatus::Skipped(reason) => println!("[Skipped] {} - {}", summary.download().filename, reason),
    ///         other => println!("[{}] {}", other, summary.download().filename),
    ///     })
    ///     .build();
    /// ```
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Summary) + Send + Sync + 'static,
    {
        self.config.on_complete = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Set whether to overwrite existing files.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    /// Directory of the JSON resume documents. Defaults to the download
    /// directory.
    pub fn state_dir(mut self, state_dir: PathBuf) -> Self {
        self.config.state_dir = Some(state_dir);
        self
    }

    /// Use `store` instead of JSON documents to persist chunk progress.
    pub fn resume_store(mut self, store: Arc<dyn ResumeStore>) -> Self {
        self.config.resume_store = Some(store);
        self
    }

    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add http headers sent with every request.
    ///
    /// Calling `.headers()` several times merges every map.
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue, HeaderMap};
    /// use shardload::downloader::DownloaderBuilder;
    ///
    /// let ua = HeaderValue::from_static("curl/7.87");
    ///
    /// let builder = DownloaderBuilder::new()
    ///     .headers(HeaderMap::from_iter([(header::USER_AGENT, ua)]))
    ///     .build();
    /// ```
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add one http header.
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue};
    /// use shardload::downloader::DownloaderBuilder;
    ///
    /// let builder = DownloaderBuilder::new()
    ///     .header(header::REFERER, HeaderValue::from_static("https://fmoviesunblocked.net/"))
    ///     .header(header::ACCEPT, HeaderValue::from_static("*/*"))
    ///     .build();
    /// ```
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`Downloader`] with the specified options.
    pub fn build(self) -> Downloader {
        Downloader::new(self.config)
    }
}
