//! HTTP client setup and middleware configuration.
//!
//! The client is a plain reqwest client with connect/read timeouts and a
//! bounded idle pool, wrapped in `reqwest-middleware` for tracing and for
//! transport-level retries with exponential backoff. Chunk-level retries
//! are handled separately by the chunk worker.
//!
//! # Examples
//!
//! ```rust
//! use shardload::http::{create_http_client, HttpClientConfig, Timeouts};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig {
//!     retries: 0,
//!     timeouts: Timeouts {
//!         connect: Duration::from_secs(5),
//!         ..Timeouts::default()
//!     },
//!     ..HttpClientConfig::default()
//! };
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

use reqwest::{header::HeaderMap, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// Number of retries for transport-level failures (connect errors, etc.).
pub const DEFAULT_HTTP_RETRIES: u32 = 3;

/// Timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time to establish a connection.
    pub connect: Duration,
    /// Maximum idle time between two reads of the response.
    pub read: Duration,
    /// Maximum time for a single write to a part artifact.
    pub write: Duration,
    /// Time to wait for a free connection slot.
    pub pool: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(20),
            read: Duration::from_secs(120),
            write: Duration::from_secs(60),
            pool: Duration::from_secs(20),
        }
    }
}

/// Connection pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Total concurrent connections across every job sharing the client.
    pub max_connections: usize,
    /// Idle keep-alive connections kept per host.
    pub max_idle_per_host: usize,
    /// How long an idle connection is kept alive.
    pub idle_timeout: Duration,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration for HTTP client setup.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Number of transport-level retries for failed requests.
    pub retries: u32,
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// Request timeouts.
    pub timeouts: Timeouts,
    /// Connection pool limits.
    pub limits: PoolLimits,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_HTTP_RETRIES,
            proxy: None,
            headers: None,
            timeouts: Timeouts::default(),
            limits: PoolLimits::default(),
        }
    }
}

/// Creates an HTTP client with middleware configuration.
pub fn create_http_client(
    config: HttpClientConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    // Set up retry policy with exponential backoff
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.retries);

    let mut inner_client_builder = reqwest::Client::builder()
        .connect_timeout(config.timeouts.connect)
        .read_timeout(config.timeouts.read)
        .pool_max_idle_per_host(config.limits.max_idle_per_host)
        .pool_idle_timeout(config.limits.idle_timeout)
        .tcp_keepalive(config.limits.idle_timeout);

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        // Retry failed requests.
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.retries, 3);
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert_eq!(config.timeouts.read, Duration::from_secs(120));
        assert_eq!(config.limits.max_connections, 100);
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));

        let config = HttpClientConfig {
            retries: 5,
            headers: Some(headers),
            ..HttpClientConfig::default()
        };

        assert!(create_http_client(config).is_ok());
    }
}
