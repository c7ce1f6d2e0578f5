//! Ranged GETs and size probes over the shared client.

use super::client::{create_http_client, HttpClientConfig};
use super::limiter::ConnectionLimiter;
use crate::chunk::Chunk;
use crate::error::TransferError;
use crate::utils::content_length::{header_content_length, parse_content_range, total_size};

use bytes::Bytes;
use reqwest::{
    header::{ACCEPT_RANGES, CONTENT_RANGE, RANGE},
    Response, StatusCode, Url,
};
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

/// What a probe learned about a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Total size in bytes, if the server advertised it.
    pub total_size: Option<u64>,
    /// Whether the server is expected to honor `Range` requests.
    pub accepts_ranges: bool,
}

/// HTTP transport shared by every chunk worker of a downloader.
///
/// Cloning is cheap: the connection pool and the connection limiter are
/// shared between clones.
#[derive(Debug, Clone)]
pub struct Transport {
    client: ClientWithMiddleware,
    limiter: ConnectionLimiter,
    pool_timeout: Duration,
}

impl Transport {
    /// Build a transport from an HTTP client configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let limiter = ConnectionLimiter::new(config.limits.max_connections);
        let pool_timeout = config.timeouts.pool;
        let client = create_http_client(config)?;
        Ok(Self::with_client(client, limiter, pool_timeout))
    }

    /// Wrap an existing client.
    pub fn with_client(
        client: ClientWithMiddleware,
        limiter: ConnectionLimiter,
        pool_timeout: Duration,
    ) -> Self {
        Self {
            client,
            limiter,
            pool_timeout,
        }
    }

    /// The connection limiter shared by this transport.
    pub fn limiter(&self) -> &ConnectionLimiter {
        &self.limiter
    }

    /// Discover the size of a resource.
    ///
    /// By default a HEAD request is used. Some servers only report an
    /// accurate size for range requests, in which case `use_range` issues a
    /// `bytes=0-0` GET and reads the Content-Range total instead.
    pub async fn probe(&self, url: &Url, use_range: bool) -> Result<Probe, TransferError> {
        let _permit = self.limiter.acquire(self.pool_timeout).await?;

        if use_range {
            debug!(%url, "Probing size with a range request");
            let response = self
                .client
                .get(url.clone())
                .header(RANGE, "bytes=0-0")
                .send()
                .await
                .map_err(classify)?;

            return match response.status() {
                StatusCode::PARTIAL_CONTENT | StatusCode::RANGE_NOT_SATISFIABLE => Ok(Probe {
                    total_size: total_size(response.headers()),
                    accepts_ranges: true,
                }),
                StatusCode::OK => Ok(Probe {
                    total_size: header_content_length(response.headers()),
                    accepts_ranges: false,
                }),
                status => Err(TransferError::Status(status)),
            };
        }

        debug!(%url, "Probing size with a HEAD request");
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(TransferError::Status(response.status()));
        }

        let accepts_ranges = !matches!(
            response.headers().get(ACCEPT_RANGES),
            Some(value) if value == "none"
        );

        Ok(Probe {
            total_size: header_content_length(response.headers()),
            accepts_ranges,
        })
    }

    /// Request the bytes of one chunk.
    ///
    /// `total_size` lets a plain `200 OK` through when the chunk spans the
    /// entire resource; otherwise only `206 Partial Content` with a matching
    /// Content-Range is accepted.
    pub async fn fetch_range(
        &self,
        url: &Url,
        chunk: &Chunk,
        total_size: u64,
    ) -> Result<RangeResponse, TransferError> {
        let permit = self.limiter.acquire(self.pool_timeout).await?;

        let response = self
            .client
            .get(url.clone())
            .header(RANGE, chunk.range_header())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let ignored = TransferError::RangeIgnored {
            status,
            start: chunk.start,
            end: chunk.end,
        };

        match status {
            StatusCode::PARTIAL_CONTENT => {
                let served = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_content_range);
                if let Some(range) = served {
                    let end = range.end.checked_add(1);
                    if range.start != chunk.start || end != Some(chunk.end) {
                        return Err(ignored);
                    }
                }
            }
            StatusCode::OK if chunk.start == 0 && chunk.end == total_size => {}
            StatusCode::OK => return Err(ignored),
            status => return Err(TransferError::Status(status)),
        }

        Ok(RangeResponse {
            response,
            _permit: permit,
        })
    }
}

/// An accepted response for one chunk.
///
/// Holds its connection slot until dropped.
#[derive(Debug)]
pub struct RangeResponse {
    response: Response,
    _permit: OwnedSemaphorePermit,
}

impl RangeResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Next piece of the body, `None` once the body is exhausted.
    pub async fn next_bytes(&mut self) -> Result<Option<Bytes>, TransferError> {
        self.response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::Timeout(e.to_string())
            } else {
                TransferError::Body(e)
            }
        })
    }
}

/// Sort a request failure into a retry category.
fn classify(error: reqwest_middleware::Error) -> TransferError {
    let (timeout, connect) = match &error {
        reqwest_middleware::Error::Reqwest(e) => (e.is_timeout(), e.is_connect()),
        reqwest_middleware::Error::Middleware(_) => (false, false),
    };

    if timeout {
        TransferError::Timeout(error.to_string())
    } else if connect {
        TransferError::Connect(error)
    } else {
        TransferError::Request(error)
    }
}
