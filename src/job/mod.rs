//! Download jobs and the scheduler that runs their chunks.
//!
//! A [`DownloadJob`] is the observable handle of one file download; the
//! [`TaskScheduler`] feeds its chunks to a bounded set of tokio tasks.
//!
//! # Examples
//!
//! ```rust
//! use shardload::job::{DownloadJob, JobStatus};
//! use reqwest::Url;
//! use std::path::PathBuf;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("https://example.com/movie.mp4")?;
//! let job = DownloadJob::new(url, PathBuf::from("movie.mp4"), 4 * 1024 * 1024, 5, 3);
//! assert_eq!(job.status(), JobStatus::Pending);
//! assert_eq!(job.id().as_str(), "movie.mp4");
//! # Ok(())
//! # }
//! ```

pub mod job;
pub mod scheduler;

pub use job::{DownloadJob, JobId, JobStatus};
pub use scheduler::{SchedulerReport, TaskScheduler};
