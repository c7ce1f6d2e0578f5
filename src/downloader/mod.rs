//! The [`Downloader`], its builder and its configuration.
//!
//! - `downloader` - runs download jobs: probe, resume, schedule, assemble
//! - `builder` - [`DownloaderBuilder`] for fluent configuration
//! - `config` - configuration values and callback types
//!
//! # Examples
//!
//! ```rust
//! use shardload::downloader::DownloaderBuilder;
//! use shardload::download::Download;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = DownloaderBuilder::new()
//!     .concurrent_downloads(2)
//!     .on_complete(|summary| {
//!         println!("{}: {}", summary.download().filename, summary.status());
//!     })
//!     .build();
//!
//! let downloads = vec![Download::try_from("https://example.com/file1.zip")?];
//! let summaries = downloader.download(&downloads, None).await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod downloader;

pub use builder::DownloaderBuilder;
pub use config::{DownloadCallback, DownloaderConfig};
pub use downloader::Downloader;
