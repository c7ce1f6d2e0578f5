//! Download requests, their summaries, and hash verification.
//!
//! - [`download`] - the [`Download`] request and file name extraction
//! - [`summary`] - per-file outcome reporting
//! - [`hash`] - MD5 / CRC32 verification of finished files
//!
//! # Examples
//!
//! ```rust
//! use shardload::download::Download;
//!
//! let download = Download::try_from("https://example.com/file.zip")?;
//! println!("Downloading: {}", download.filename);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod download;
pub mod hash;
pub mod summary;

pub use download::Download;
pub use hash::{detect_hash_type, verify_hash, HashType};
pub use summary::Summary;
