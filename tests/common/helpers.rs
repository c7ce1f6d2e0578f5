use flate2::Crc;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use shardload::chunk::Backoff;
use shardload::download::Download;
use shardload::downloader::DownloaderBuilder;
use shardload::progress::{ProgressBarOpts, StyleOptions};
use shardload::HttpClientConfig;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// Common test constants
pub const TEST_DOMAIN: &str = "http://domain.com/file.zip";
pub const TEST_USER_AGENT: &str = "shardload-test-agent";
pub const TEST_FILE_PATH: &str = "/media/blob.bin";
pub const TEST_FILE_NAME: &str = "blob.bin";

static TRACING: Once = Once::new();

/// Installs a test subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates a test URL for download testing
pub fn create_test_url(filename: &str) -> String {
    format!("https://example.com/{}", filename)
}

/// Deterministic content where every byte depends on its offset.
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}

/// CRC32 of `content` in the decimal form accepted as an expected hash.
pub fn crc32_of(content: &[u8]) -> String {
    let mut crc = Crc::new();
    crc.update(content);
    crc.sum().to_string()
}

/// Creates a test download with the given filename
pub fn create_test_download(filename: &str) -> Download {
    let url = create_test_url(filename);
    Download::try_from(url.as_str()).expect("Failed to create download")
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that no file exists at the given path
pub fn assert_file_missing(path: &Path) {
    assert!(!path.exists(), "File should not exist at path: {:?}", path);
}

/// Asserts that the file holds exactly `content`
pub fn assert_file_content(path: &Path, content: &[u8]) {
    let actual = fs::read(path).expect("Failed to read file");
    assert_eq!(actual.len(), content.len(), "File size mismatch for {:?}", path);
    assert!(actual == content, "File content mismatch for {:?}", path);
}

/// Part artifacts left in `dir`.
pub fn part_files(dir: &Path) -> Vec<PathBuf> {
    let mut parts: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to read directory")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "part"))
        .collect();
    parts.sort();
    parts
}

// === Range Server Helpers ===

/// Serves `content` honoring single `bytes=start-end` ranges.
///
/// Ranges whose start is listed in `failing` always get a 500. Chunk
/// requests, i.e. anything but the `bytes=0-0` size probe, wait `delay`.
#[derive(Clone)]
pub struct RangeResponder {
    content: Vec<u8>,
    failing: HashSet<u64>,
    delay: Option<Duration>,
    honor_ranges: bool,
}

impl RangeResponder {
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            failing: HashSet::new(),
            delay: None,
            honor_ranges: true,
        }
    }

    pub fn failing(mut self, start: u64) -> Self {
        self.failing.insert(start);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer every request with the full body.
    pub fn ignore_ranges(mut self) -> Self {
        self.honor_ranges = false;
        self
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.content.len() as u64;
        let range = request
            .headers
            .get("range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_range_header);

        let Some((start, end)) = range.filter(|_| self.honor_ranges) else {
            return ResponseTemplate::new(200).set_body_bytes(self.content.clone());
        };

        if self.failing.contains(&start) {
            return ResponseTemplate::new(500);
        }
        if start >= len {
            return ResponseTemplate::new(416)
                .insert_header("content-range", format!("bytes */{}", len).as_str());
        }

        let end = end.min(len - 1);
        let mut response = ResponseTemplate::new(206)
            .insert_header(
                "content-range",
                format!("bytes {}-{}/{}", start, end, len).as_str(),
            )
            .set_body_bytes(self.content[start as usize..=end as usize].to_vec());
        if let Some(delay) = self.delay.filter(|_| (start, end) != (0, 0)) {
            response = response.set_delay(delay);
        }
        response
    }
}

/// Parse `bytes=start-end` into inclusive bounds.
pub fn parse_range_header(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

/// Starts a server answering HEAD and GET for [`TEST_FILE_PATH`].
pub async fn start_range_server(responder: RangeResponder) -> MockServer {
    let server = MockServer::start().await;
    mount_range_responder(&server, responder).await;
    server
}

/// Mounts HEAD and GET mocks for [`TEST_FILE_PATH`] on `server`.
pub async fn mount_range_responder(server: &MockServer, responder: RangeResponder) {
    let content = responder.content.clone();
    let head = if responder.honor_ranges {
        ResponseTemplate::new(200)
            .insert_header("accept-ranges", "bytes")
            .set_body_bytes(content)
    } else {
        ResponseTemplate::new(200)
            .insert_header("accept-ranges", "none")
            .set_body_bytes(content)
    };
    Mock::given(method("HEAD"))
        .and(path(TEST_FILE_PATH))
        .respond_with(head)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(TEST_FILE_PATH))
        .respond_with(responder)
        .mount(server)
        .await;
}

/// Download of [`TEST_FILE_PATH`] on `server`.
pub fn server_download(server: &MockServer) -> Download {
    let url = format!("{}{}", server.uri(), TEST_FILE_PATH);
    Download::try_from(url.as_str()).expect("Failed to create download")
}

/// `Range` headers of every GET the server received, in arrival order.
pub async fn received_ranges(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == "GET")
        .filter_map(|request| {
            request
                .headers
                .get("range")
                .and_then(|value| value.to_str().ok())
                .map(String::from)
        })
        .collect()
}

/// Ranged GETs the server received, excluding the size probe.
pub async fn chunk_requests(server: &MockServer) -> Vec<String> {
    received_ranges(server)
        .await
        .into_iter()
        .filter(|range| range != "bytes=0-0")
        .collect()
}

// === HTTP Configuration Helpers ===

/// Creates test headers with common user agent
pub fn create_test_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(TEST_USER_AGENT));
    headers
}

/// Creates test headers with custom user agent
pub fn create_test_headers_with_agent(agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(agent).expect("Invalid header value"));
    headers
}

/// Creates a test HTTP client configuration
pub fn create_test_http_config() -> HttpClientConfig {
    HttpClientConfig {
        retries: 0,
        headers: Some(create_test_headers()),
        ..HttpClientConfig::default()
    }
}

/// Creates a test HTTP client configuration with custom retries
pub fn create_test_http_config_with_retries(retries: u32) -> HttpClientConfig {
    HttpClientConfig {
        retries,
        headers: Some(create_test_headers()),
        ..HttpClientConfig::default()
    }
}

// === Progress Bar Helpers ===

/// Creates default test progress bar options
pub fn create_test_progress_opts() -> ProgressBarOpts {
    ProgressBarOpts::new(None, None, true, false)
}

/// Creates hidden progress bar options for testing
pub fn create_hidden_progress_opts() -> ProgressBarOpts {
    ProgressBarOpts::hidden()
}

/// Creates pip-style progress bar options for testing
pub fn create_pip_style_progress_opts() -> ProgressBarOpts {
    ProgressBarOpts::with_pip_style()
}

/// Creates default test style options
pub fn create_test_style_options() -> StyleOptions {
    StyleOptions::new(create_test_progress_opts(), create_pip_style_progress_opts())
}

/// Creates disabled style options for testing
pub fn create_disabled_style_options() -> StyleOptions {
    StyleOptions::new(create_hidden_progress_opts(), create_hidden_progress_opts())
}

// === Downloader Builder Helpers ===

/// Backoff short enough to keep retry tests fast.
pub fn quick_backoff() -> Backoff {
    Backoff {
        base: Duration::from_millis(5),
        max: Duration::from_millis(20),
    }
}

/// A hidden downloader writing to `dir`, without transport retries so
/// request counts are exact.
pub fn create_test_downloader_builder(dir: &Path) -> DownloaderBuilder {
    init_tracing();
    DownloaderBuilder::hidden()
        .directory(dir.to_path_buf())
        .transport_retries(0)
        .backoff(quick_backoff())
        .use_range_for_content_length(true)
        .headers(create_test_headers())
}
