//! Terminal progress display.
//!
//! - `style` - bar templates and options
//! - `display` - the main bar and per-file bars of a batch
//!
//! # Examples
//!
//! ```rust
//! use shardload::progress::{ProgressBarOpts, StyleOptions};
//! use shardload::DownloaderBuilder;
//!
//! let downloader = DownloaderBuilder::new()
//!     .style_options(StyleOptions::new(
//!         ProgressBarOpts::hidden(),
//!         ProgressBarOpts::with_pip_style(),
//!     ))
//!     .build();
//! ```

pub(crate) mod display;
pub(crate) mod style;

pub use display::ProgressDisplay;
pub use style::{ProgressBarOpts, StyleOptions};
