//! HTTP module containing the transport used by chunk workers.
//!
//! - [`client`] - client creation, timeouts, pool limits and middleware
//! - [`limiter`] - global cap on concurrent connections
//! - [`transport`] - size probes and ranged GETs with classified errors
//!
//! # Examples
//!
//! ```rust
//! use shardload::http::{HttpClientConfig, Transport};
//! use reqwest::header::{HeaderMap, USER_AGENT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(USER_AGENT, "MyApp/1.0".parse()?);
//!
//! let transport = Transport::new(HttpClientConfig {
//!     headers: Some(headers),
//!     ..HttpClientConfig::default()
//! })?;
//! assert_eq!(transport.limiter().capacity(), 100);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod limiter;
pub mod transport;

pub use client::{create_http_client, HttpClientConfig, PoolLimits, Timeouts, DEFAULT_HTTP_RETRIES};
pub use limiter::ConnectionLimiter;
pub use transport::{Probe, RangeResponse, Transport};
