//! Core downloader: runs download jobs chunk by chunk.
//!
//! For each file the downloader applies the overwrite policy, restores the
//! resume state of a previous run, probes the resource when the stored
//! layout cannot be reused, plans the chunks, runs them through the task
//! scheduler and assembles the destination.
//!
//! # Examples
//!
//! ```rust,no_run
//! use shardload::downloader::DownloaderBuilder;
//! use shardload::download::Download;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("./downloads"))
//!     .task_limit(8)
//!     .build();
//! let downloads = vec![
//!     Download::try_from("https://example.com/video/movie.mp4")?,
//!     Download::try_from("https://example.com/subs/movie.en.srt")?,
//! ];
//!
//! for summary in downloader.download(&downloads, None).await {
//!     println!("{}: {}", summary.download().filename, summary.status());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing and Cancelling a Job
//!
//! ```rust,no_run
//! use shardload::downloader::DownloaderBuilder;
//! use shardload::download::Download;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::hidden().build();
//! let job = downloader.job(&Download::try_from("https://example.com/big.iso")?);
//!
//! let mut status = job.subscribe();
//! let handle = job.clone();
//! tokio::spawn(async move {
//!     while status.changed().await.is_ok() {
//!         println!("{}", *status.borrow());
//!     }
//! });
//!
//! let runner = downloader.clone();
//! let task = tokio::spawn(async move { runner.run(&job, None).await });
//! handle.cancel();
//! let summary = task.await?;
//! # Ok(())
//! # }
//! ```

use super::config::DownloaderConfig;
use crate::assembler::Assembler;
use crate::chunk::{plan_chunks, ChunkState, ChunkWorker};
use crate::download::{hash::verify_hash, Download, Summary};
use crate::error::{Error, Result};
use crate::http::{create_http_client, ConnectionLimiter, HttpClientConfig, Transport};
use crate::job::{DownloadJob, JobStatus, TaskScheduler};
use crate::progress::ProgressDisplay;
use crate::resume::{JsonResumeStore, Layout, ResumeStore};
use crate::sink::ChunkSink;

use futures::stream::{self, StreamExt};
use reqwest::{header::HeaderMap, Proxy};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Represents the download controller.
///
/// A downloader can be created via its builder:
///
/// ```rust
/// use shardload::downloader::DownloaderBuilder;
///
/// let d = DownloaderBuilder::new().build();
/// ```
///
/// Clones share the resume store and the connection limiter.
#[derive(Clone)]
pub struct Downloader {
    config: DownloaderConfig,
    store: Arc<dyn ResumeStore>,
    limiter: ConnectionLimiter,
}

impl Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl Downloader {
    pub(crate) fn new(config: DownloaderConfig) -> Self {
        let store = match config.resume_store.clone() {
            Some(store) => store,
            None => Arc::new(JsonResumeStore::new(config.state_dir())),
        };
        let limiter = ConnectionLimiter::new(config.limits.max_connections);
        Self {
            config,
            store,
            limiter,
        }
    }

    /// Gets the directory where files will be downloaded.
    pub fn directory(&self) -> &PathBuf {
        &self.config.directory
    }

    pub fn chunk_size(&self) -> u64 {
        self.config.chunk_size
    }

    pub fn task_limit(&self) -> usize {
        self.config.task_limit
    }

    pub fn retry_attempts(&self) -> u32 {
        self.config.retry_attempts
    }

    /// Gets the number of concurrent downloads.
    pub fn concurrent_downloads(&self) -> usize {
        self.config.concurrent_downloads
    }

    /// Gets whether downloads are resumable.
    pub fn resumable(&self) -> bool {
        self.config.resumable
    }

    /// Gets the custom headers.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.config.headers.as_ref()
    }

    /// Gets whether to use range requests for content length.
    pub fn use_range_for_content_length(&self) -> bool {
        self.config.use_range_for_content_length
    }

    /// Gets whether to overwrite existing files.
    pub fn overwrite(&self) -> bool {
        self.config.overwrite
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// The store recording chunk progress.
    pub fn resume_store(&self) -> &Arc<dyn ResumeStore> {
        &self.store
    }

    /// Create the job handle for `download`.
    ///
    /// The job lands in the download directory and uses the configured
    /// chunk size, task limit and retry attempts.
    pub fn job(&self, download: &Download) -> DownloadJob {
        DownloadJob::new(
            download.url.clone(),
            self.config.directory.join(&download.filename),
            self.config.chunk_size,
            self.config.task_limit,
            self.config.retry_attempts,
        )
        .with_hash(download.hash.clone())
    }

    /// Build the HTTP transport for one batch.
    pub fn transport(&self, proxy: Option<Proxy>) -> Result<Transport> {
        let client = create_http_client(HttpClientConfig {
            retries: self.config.transport_retries,
            proxy,
            headers: self.config.headers.clone(),
            timeouts: self.config.timeouts,
            limits: self.config.limits,
        })?;
        Ok(Transport::with_client(
            client,
            self.limiter.clone(),
            self.config.timeouts.pool,
        ))
    }

    /// Download every file, `concurrent_downloads` at a time, each one in
    /// chunks. Summaries come back in completion order.
    pub async fn download(&self, downloads: &[Download], proxy: Option<Proxy>) -> Vec<Summary> {
        let transport = match self.transport(proxy) {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "Could not build the HTTP client");
                return downloads
                    .iter()
                    .map(|download| self.report(Summary::new(download.clone(), 0).fail(&e)))
                    .collect();
            }
        };

        let progress_display = ProgressDisplay::new(
            self.config.style_options.clone(),
            downloads.len(),
            self.config.single_file_progress,
        );

        let summaries = stream::iter(downloads)
            .map(|download| {
                let job = self.job(download);
                self.fetch(&transport, download.clone(), job, &progress_display)
            })
            .buffer_unordered(self.config.concurrent_downloads.max(1))
            .collect::<Vec<_>>()
            .await;

        progress_display.finish();
        summaries
    }

    /// Download a single file.
    pub async fn download_one(&self, download: &Download, proxy: Option<Proxy>) -> Summary {
        let job = self.job(download);
        self.run(&job, proxy).await
    }

    /// Run an existing job to a terminal state.
    ///
    /// The job handle can be cloned beforehand to observe or cancel it
    /// while it runs.
    pub async fn run(&self, job: &DownloadJob, proxy: Option<Proxy>) -> Summary {
        let download = Download::new_with_hash(
            job.url(),
            job.id().as_str(),
            job.hash().map(String::from),
        );

        let transport = match self.transport(proxy) {
            Ok(transport) => transport,
            Err(e) => {
                job.transition(JobStatus::from_error(&e));
                return self.report(Summary::new(download, 0).fail(&e));
            }
        };

        let progress_display =
            ProgressDisplay::new(self.config.style_options.clone(), 1, self.config.single_file_progress);
        let summary = self
            .fetch(&transport, download, job.clone(), &progress_display)
            .await;
        progress_display.finish();
        summary
    }

    /// Run one job and settle its status.
    async fn fetch(
        &self,
        transport: &Transport,
        download: Download,
        job: DownloadJob,
        progress_display: &ProgressDisplay,
    ) -> Summary {
        let current = job.status();
        if current.is_terminal() {
            debug!(job = %job.id(), status = %current, "Job already ran");
            return Summary::new(download, job.total_size().unwrap_or(0)).with_status(current);
        }

        let summary = match self
            .execute(transport, &download, &job, progress_display)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(job = %job.id(), error = %e.detailed(), "Download failed");
                Summary::new(download, job.total_size().unwrap_or(0)).fail(&e)
            }
        };

        job.transition(summary.status().clone());
        self.report(summary)
    }

    fn report(&self, summary: Summary) -> Summary {
        if let Some(ref callback) = self.config.on_complete {
            callback(&summary);
        }
        summary
    }

    async fn execute(
        &self,
        transport: &Transport,
        download: &Download,
        job: &DownloadJob,
        progress_display: &ProgressDisplay,
    ) -> Result<Summary> {
        download.validate()?;
        if job.chunk_size() == 0 {
            return Err(Error::InvalidSize { chunk_size: 0 });
        }
        if job.is_cancelled() {
            return Err(Error::Cancelled);
        }
        job.transition(JobStatus::Downloading);

        let destination = job.destination().to_path_buf();
        if let Some(skipped) = self.check_existing(download, job, &destination).await? {
            return Ok(skipped);
        }

        let dir = destination
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let sink = self.config.mode.sink(&dir, job.id().as_str());
        let job_id = job.id();

        if !self.config.resumable {
            self.store.clear(job_id).await?;
        }
        let resume = self.store.load(job_id).await?;

        let url = job.url().to_string();
        let layout = match resume.layout.as_ref() {
            Some(layout) if layout.url == url && layout.fits(job.chunk_size()) => {
                debug!(job = %job_id, total = layout.total_size, "Reusing stored layout");
                layout.clone()
            }
            stored => {
                let layout = self.probe(transport, job).await?;
                if let Some(stale) = stored.filter(|stored| **stored != layout) {
                    info!(job = %job_id, "Resource layout changed, discarding previous parts");
                    discard_layout(sink.as_ref(), stale).await;
                }
                self.store.save_layout(job_id, layout.clone()).await?;
                layout
            }
        };
        let records = if resume.layout.as_ref() == Some(&layout) {
            resume.chunks
        } else {
            BTreeMap::new()
        };

        job.set_total_size(layout.total_size);
        let chunks = plan_chunks(layout.total_size, layout.chunk_size)?;
        sink.prepare(layout.total_size).await?;

        let mut states = Vec::with_capacity(chunks.len());
        let mut resumed_chunks = 0;
        let mut resumed_bytes = 0;
        for chunk in chunks {
            let record = records.get(&chunk.index).filter(|record| record.completes(&chunk));
            let reusable = match record {
                Some(record) if self.config.verify_parts => {
                    let valid = sink.verify(&chunk, record.checksum).await?;
                    if !valid {
                        debug!(job = %job_id, chunk = chunk.index, "Part failed verification");
                    }
                    valid
                }
                Some(_) => true,
                None => false,
            };

            if reusable {
                resumed_chunks += 1;
                resumed_bytes += chunk.len();
                states.push(ChunkState::complete(chunk, record.and_then(|r| r.checksum)));
            } else {
                states.push(ChunkState::pending(chunk));
            }
        }
        info!(
            job = %job_id,
            chunks = states.len(),
            resumed = resumed_chunks,
            total = layout.total_size,
            "Starting download"
        );

        let bar = progress_display.file_bar(&download.filename, layout.total_size, resumed_bytes);
        let run_token = job.cancel_token().child_token();
        let worker = ChunkWorker::new(
            transport.clone(),
            sink.clone(),
            job.url().clone(),
            layout.total_size,
            run_token.clone(),
        )
        .retry_attempts(job.retry_attempts())
        .backoff(self.config.backoff)
        .write_timeout(self.config.timeouts.write);
        let scheduler = TaskScheduler::new(
            job_id.clone(),
            worker,
            self.store.clone(),
            job.task_limit(),
            run_token,
        )
        .progress(bar.clone());

        let scheduled = scheduler.run(&mut states).await;
        progress_display.finish_file(bar);
        let report = scheduled?;

        let size = Assembler::new(
            job_id.clone(),
            sink,
            self.store.clone(),
            destination,
            layout.total_size,
        )
        .expected_hash(job.hash().map(String::from))
        .assemble(&states)
        .await?;

        Ok(Summary::new(download.clone(), size)
            .with_report(report, resumed_chunks)
            .with_status(JobStatus::Finished))
    }

    /// Apply the overwrite policy to an existing destination.
    ///
    /// Returns a skipped summary when the existing file can be kept.
    async fn check_existing(
        &self,
        download: &Download,
        job: &DownloadJob,
        destination: &Path,
    ) -> Result<Option<Summary>> {
        if !destination.exists() {
            return Ok(None);
        }

        if !self.config.overwrite {
            match verify_hash(destination, job.hash()).await {
                Ok(true) => {
                    let size = fs::metadata(destination).await?.len();
                    info!(job = %job.id(), "File exists with matching hash, skipping");
                    return Ok(Some(
                        Summary::new(download.clone(), size).skip("File exists with matching hash"),
                    ));
                }
                Ok(false) => warn!(job = %job.id(), "Hash mismatch, downloading again"),
                Err(e) => debug!(job = %job.id(), error = %e, "Could not hash existing file"),
            }
        }

        // Assembly replaces the file by rename, so it stays until then.
        self.store.clear(job.id()).await?;
        Ok(None)
    }

    async fn probe(&self, transport: &Transport, job: &DownloadJob) -> Result<Layout> {
        let url = job.url().to_string();
        let probe = transport
            .probe(job.url(), self.config.use_range_for_content_length)
            .await
            .map_err(|source| Error::Probe {
                url: url.clone(),
                source,
            })?;
        let total_size = probe
            .total_size
            .ok_or_else(|| Error::UnknownLength(url.clone()))?;

        // Without range support the whole resource is one chunk.
        let chunk_size = if probe.accepts_ranges {
            job.chunk_size()
        } else {
            info!(job = %job.id(), "Server does not accept ranges, using a single connection");
            total_size.max(1)
        };
        debug!(job = %job.id(), total_size, chunk_size, "Probed resource");

        Ok(Layout {
            url,
            total_size,
            chunk_size,
        })
    }
}

/// Remove the parts planned under a layout that no longer applies.
async fn discard_layout(sink: &dyn ChunkSink, layout: &Layout) {
    match plan_chunks(layout.total_size, layout.chunk_size) {
        Ok(chunks) => {
            if let Err(e) = sink.discard(&chunks).await {
                warn!(error = %e, "Could not remove stale parts");
            }
        }
        Err(e) => debug!(error = %e, "Stored layout cannot be planned"),
    }
}
