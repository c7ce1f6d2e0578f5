//! Shardload downloads large files over HTTP(S) in byte-range chunks,
//! several connections at a time, and resumes interrupted downloads
//! without fetching finished chunks again.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use shardload::{download::Download, downloader::DownloaderBuilder, Error};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let movie = "https://example.com/media/movie.mp4";
//! let downloads = vec![Download::try_from(movie)?];
//! let downloader = DownloaderBuilder::new()
//!     .directory(PathBuf::from("output"))
//!     .task_limit(5)
//!     .build();
//! downloader.download(&downloads, None).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`downloader`] - the `Downloader` and `DownloaderBuilder`
//! - [`job`] - observable download jobs and the chunk task scheduler
//! - [`chunk`] - chunk planning and per-chunk transfer
//! - [`resume`] - persisted chunk progress
//! - [`sink`] - part artifacts on disk
//! - [`assembler`] - turning parts into the destination file
//! - [`http`] - HTTP client, connection limiter and ranged requests
//! - [`download`] - download requests, summaries and hash verification
//! - [`presets`] - mirror hosts, download headers and defaults
//! - [`progress`] - progress bar styling and display
//! - [`error`] - the `Error` enum
//! - [`utils`] - header parsing helpers

pub mod assembler;
pub mod chunk;
pub mod download;
pub mod downloader;
pub mod error;
pub mod http;
pub mod job;
pub mod presets;
pub mod progress;
pub mod resume;
pub mod sink;
pub mod utils;

pub use chunk::{plan_chunks, Chunk, ChunkStatus};
pub use download::hash::{detect_hash_type, verify_hash, HashType};
pub use download::{Download, Summary};
pub use downloader::{Downloader, DownloaderBuilder};
pub use error::{Error, FailureKind, FailureReason, Result, TransferError};
pub use http::{create_http_client, HttpClientConfig};
pub use job::{DownloadJob, JobId, JobStatus};
pub use progress::{ProgressBarOpts, StyleOptions};
pub use resume::{JsonResumeStore, MemoryResumeStore, ResumeStore};
pub use sink::DownloadMode;
