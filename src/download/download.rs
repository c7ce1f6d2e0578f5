//! The [`Download`] request: what to fetch and where it lands.
//!
//! # Examples
//!
//! ```rust
//! use shardload::download::Download;
//!
//! // File name extracted from the URL
//! let download = Download::try_from("https://example.com/video/movie.mp4")?;
//! assert_eq!(download.filename, "movie.mp4");
//!
//! // Custom file name and expected MD5
//! let url = reqwest::Url::parse("https://example.com/stream?id=42")?;
//! let download = Download::new_with_hash(
//!     &url,
//!     "movie.mp4",
//!     Some("d41d8cd98f00b204e9800998ecf8427e".to_string()),
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{Error, Result};
use crate::sink::PART_EXTENSION;

use reqwest::Url;
use std::convert::TryFrom;
use std::path::Path;

/// Represents a file to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// URL of the file to download.
    pub url: Url,
    /// File name used to save the file on disk.
    pub filename: String,
    /// Hash of the file (MD5 or CRC32).
    pub hash: Option<String>,
}

impl Download {
    /// Creates a new [`Download`].
    ///
    /// When using [`Download::try_from`], the file name is extracted from
    /// the URL instead.
    pub fn new(url: &Url, filename: &str) -> Self {
        Self {
            url: url.clone(),
            filename: String::from(filename),
            hash: None,
        }
    }

    /// Creates a new [`Download`] with hash.
    pub fn new_with_hash(url: &Url, filename: &str, hash: Option<String>) -> Self {
        Self {
            url: url.clone(),
            filename: String::from(filename),
            hash,
        }
    }

    /// Check that the file name can be used as a destination.
    ///
    /// Names that are empty, contain path separators or end with the
    /// reserved part extension are rejected.
    pub fn validate(&self) -> Result<()> {
        let name = self.filename.as_str();
        let reserved = format!(".{}", PART_EXTENSION);
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.ends_with(&reserved)
        {
            return Err(Error::InvalidUrl(format!(
                "\"{}\" cannot be used as a file name",
                name
            )));
        }
        Ok(())
    }

    /// Calculate the hash of a local file and compare it with the expected hash.
    /// Returns true if the hashes match or if no hash is provided.
    pub async fn verify_hash(&self, file_path: &Path) -> Result<bool> {
        super::hash::verify_hash(file_path, self.hash.as_deref()).await
    }
}

impl TryFrom<&Url> for Download {
    type Error = crate::error::Error;

    fn try_from(value: &Url) -> std::result::Result<Self, Self::Error> {
        let filename = value
            .path_segments()
            .ok_or_else(|| {
                Error::InvalidUrl(format!(
                    "The url \"{}\" does not contain a valid path",
                    value
                ))
            })?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                form_urlencoded::parse(segment.as_bytes())
                    .map(|(key, val)| [key, val].concat())
                    .collect::<String>()
            })
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", value))
            })?;

        let download = Download {
            url: value.clone(),
            filename,
            hash: None,
        };
        download.validate()?;
        Ok(download)
    }
}

impl TryFrom<&str> for Download {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Url::parse(value)
            .map_err(|e| {
                Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e))
            })
            .and_then(|u| Download::try_from(&u))
    }
}
