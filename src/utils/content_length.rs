//! Content length extraction utilities.
//!
//! This module provides utilities for reading resource sizes and ranges from
//! HTTP responses, supporting both Content-Range and Content-Length headers.

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE};

/// A parsed `Content-Range: bytes start-end/total` header.
///
/// `end` is inclusive, as on the wire. `total` is `None` for `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

/// Parse a Content-Range header value.
///
/// # Example
///
/// ```rust
/// use shardload::utils::{parse_content_range, ContentRange};
///
/// assert_eq!(
///     parse_content_range("bytes 300-599/1000"),
///     Some(ContentRange { start: 300, end: 599, total: Some(1000) })
/// );
/// ```
pub fn parse_content_range(content_range: &str) -> Option<ContentRange> {
    let spec = content_range.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = spec.split_once('/')?;
    let (start, end) = range.trim().split_once('-')?;
    let total = match total.trim() {
        "*" => None,
        value => Some(value.parse::<u64>().ok()?),
    };

    Some(ContentRange {
        start: start.trim().parse().ok()?,
        end: end.trim().parse().ok()?,
        total,
    })
}

/// Parse Content-Range header to extract total size.
///
/// ```rust
/// use shardload::utils::parse_content_range_total;
///
/// let total = parse_content_range_total("bytes 0-1023/2048");
/// assert_eq!(total, Some(2048));
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range
        .split('/')
        .nth(1)
        .and_then(|size| size.trim().parse::<u64>().ok())
}

/// Read the Content-Length header.
///
/// The header is parsed directly rather than relying on the body size hint,
/// which is zero for HEAD responses.
pub fn header_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Total resource size advertised by a response.
///
/// Prefers the total of a Content-Range header, falling back to
/// Content-Length when the server answered with the full body.
pub fn total_size(headers: &HeaderMap) -> Option<u64> {
    if let Some(content_range) = headers.get(CONTENT_RANGE) {
        return content_range
            .to_str()
            .ok()
            .and_then(parse_content_range_total);
    }
    header_content_length(headers)
}
