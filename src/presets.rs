//! Defaults and request presets for media mirrors.
//!
//! Media and subtitle hosts reject downloads that do not look like they
//! come from a browser visiting one of the mirror sites. The values here
//! reproduce those requests and pick the mirror to talk to.
//!
//! # Examples
//!
//! ```rust
//! use shardload::presets::{download_headers, HostSelection};
//! use shardload::DownloaderBuilder;
//!
//! let host = HostSelection::default();
//! let downloader = DownloaderBuilder::hidden()
//!     .headers(download_headers(host.host()))
//!     .build();
//! ```

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::Url;
use std::env;
use std::fmt;

pub use crate::http::client::DEFAULT_HTTP_RETRIES;

/// Known mirror hosts, preferred first.
pub const MIRROR_HOSTS: &[&str] = &[
    "h5.aoneroom.com",
    "movieboxapp.in",
    "moviebox.pk",
    "moviebox.ph",
    "moviebox.id",
    "v.moviebox.ph",
    "netnaija.video",
];

/// Environment variable overriding the selected host.
pub const ENVIRONMENT_HOST_KEY: &str = "MOVIEBOX_API_HOST";

pub const HOST_PROTOCOL: &str = "https";

/// Referer expected by media hosts on download requests.
pub const DOWNLOAD_REQUEST_REFERER: &str = "https://fmoviesunblocked.net/";

pub const USER_AGENT_FIREFOX: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";

/// Default number of concurrent connections per file.
pub const DEFAULT_TASKS: usize = 5;

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Chunk retries used when none are configured.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Progress states reported by download callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Downloading,
    Finished,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host chosen for requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSelection {
    host: String,
}

impl Default for HostSelection {
    fn default() -> Self {
        Self {
            host: MIRROR_HOSTS[0].to_string(),
        }
    }
}

impl HostSelection {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// The host named by [`ENVIRONMENT_HOST_KEY`], or the first mirror.
    pub fn from_env() -> Self {
        match env::var(ENVIRONMENT_HOST_KEY) {
            Ok(host) if !host.trim().is_empty() => Self::new(host.trim()),
            _ => Self::default(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `https://<host>/`
    pub fn base_url(&self) -> String {
        format!("{}://{}/", HOST_PROTOCOL, self.host)
    }
}

/// Resolves a path against the mirror hosts.
#[derive(Debug, Clone)]
pub struct MirrorHosts {
    hosts: Vec<String>,
}

impl Default for MirrorHosts {
    fn default() -> Self {
        Self::new(MIRROR_HOSTS.iter().copied())
    }
}

impl MirrorHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Mirrors in preference order, with `selection` moved to the front.
    pub fn preferring(selection: &HostSelection) -> Self {
        let mut hosts = vec![selection.host().to_string()];
        hosts.extend(
            MIRROR_HOSTS
                .iter()
                .filter(|host| **host != selection.host())
                .map(|host| host.to_string()),
        );
        Self { hosts }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// `path` on every mirror, in preference order, for callers that fail
    /// over between hosts themselves. Hosts that do not form a valid URL are
    /// skipped.
    pub fn candidates(&self, path: &str) -> Vec<Url> {
        let path = path.trim_start_matches('/');
        self.hosts
            .iter()
            .filter_map(|host| Url::parse(&format!("{}://{}/{}", HOST_PROTOCOL, host, path)).ok())
            .collect()
    }
}

/// Headers for media and subtitle download requests sent on behalf of `host`.
pub fn download_headers(host: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_FIREFOX));
    if let Ok(origin) = HeaderValue::from_str(host) {
        headers.insert(ORIGIN, origin);
    }
    headers.insert(REFERER, HeaderValue::from_static(DOWNLOAD_REQUEST_REFERER));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_headers() {
        let headers = download_headers("moviebox.pk");
        assert_eq!(headers[ACCEPT], "*/*");
        assert_eq!(headers[ORIGIN], "moviebox.pk");
        assert_eq!(headers[REFERER], DOWNLOAD_REQUEST_REFERER);
        assert!(headers[USER_AGENT].to_str().unwrap().contains("Firefox/137.0"));
    }

    #[test]
    fn test_candidates_follow_preference() {
        let mirrors = MirrorHosts::preferring(&HostSelection::new("moviebox.ph"));
        let urls = mirrors.candidates("/wefeed-h5-bff/web/subject/download");

        assert_eq!(urls.len(), MIRROR_HOSTS.len());
        assert_eq!(
            urls[0].as_str(),
            "https://moviebox.ph/wefeed-h5-bff/web/subject/download"
        );
        assert_eq!(urls[1].host_str(), Some("h5.aoneroom.com"));
    }

    #[test]
    fn test_default_selection() {
        let selection = HostSelection::default();
        assert_eq!(selection.host(), "h5.aoneroom.com");
        assert_eq!(selection.base_url(), "https://h5.aoneroom.com/");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DownloadStatus::Downloading.to_string(), "downloading");
        assert_eq!(DownloadStatus::Finished.to_string(), "finished");
    }
}
