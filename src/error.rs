//! Error handling for the shardload library.
//!
//! Two layers of errors exist. [`TransferError`] describes why a single
//! attempt at one chunk failed; those are retried by the chunk worker and
//! only surface once the retry ceiling is hit. [`Error`] is what jobs and
//! public operations return. Because [`Error`] wraps non-cloneable sources,
//! the terminal job status carries a [`FailureReason`] summary instead.

use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single chunk transfer attempt failed.
///
/// Every variant is retryable from the worker's point of view.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(#[source] reqwest_middleware::Error),

    /// Connect, read or write deadline exceeded.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The request failed for another transport reason.
    #[error("request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// The server answered with a status that is not 200/206.
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// The server ignored or misaligned the requested byte range.
    #[error("range {start}-{end} not honored (status {status})")]
    RangeIgnored {
        status: StatusCode,
        start: u64,
        end: u64,
    },

    /// Reading the response body failed midway.
    #[error("body read failed: {0}")]
    Body(#[source] reqwest::Error),

    /// The body did not contain exactly the bytes of the chunk.
    #[error("expected {expected} bytes, received {actual}")]
    Length { expected: u64, actual: u64 },

    /// Writing the part artifact failed.
    #[error("part write failed: {0}")]
    Write(#[source] io::Error),

    /// No connection slot became available within the pool timeout.
    #[error("no connection slot available after {0:?}")]
    PoolTimeout(std::time::Duration),
}

/// Errors that can happen when using shardload.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system that fits no other category.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The provided URL cannot be parsed or has no usable file name.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The chunk planner was given a chunk size of zero.
    ///
    /// Never retried.
    #[error("Invalid chunk size {chunk_size}: must be greater than zero")]
    InvalidSize { chunk_size: u64 },

    /// The remote resource did not advertise its size.
    #[error("Unable to determine the size of {0}")]
    UnknownLength(String),

    /// Probing the remote resource for its size failed.
    #[error("Probing {url} failed")]
    Probe {
        url: String,
        #[source]
        source: TransferError,
    },

    /// A chunk failed on every allowed attempt. Fails the whole job.
    #[error("Chunk {index} failed after {attempts} attempts")]
    RetriesExhausted {
        index: usize,
        attempts: u32,
        #[source]
        source: TransferError,
    },

    /// Assembly was requested while chunks were missing or incomplete.
    #[error("Cannot assemble: chunk {index} is not complete")]
    Incomplete { index: usize },

    /// The assembled artifact does not have the expected length.
    ///
    /// The destination is left untouched.
    #[error("Assembled size {actual} does not match expected size {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// The assembled artifact does not match the expected hash.
    #[error("Hash mismatch for {path:?}: expected {expected}")]
    HashMismatch { path: PathBuf, expected: String },

    /// Resume state could not be persisted or read.
    ///
    /// A chunk is never reported complete without a durable save.
    #[error("Resume store error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The job was cancelled before it could finish.
    #[error("Download cancelled")]
    Cancelled,

    /// I/O Error.
    #[error("I/O error")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest Error")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error from the middleware stack wrapping reqwest.
    #[error("HTTP middleware error")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },
}

impl Error {
    pub(crate) fn persistence(message: impl Into<String>, source: io::Error) -> Self {
        Error::Persistence {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Broad category of the error, used in terminal job states.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::InvalidSize { .. } => FailureKind::InvalidSize,
            Error::RetriesExhausted { .. } => FailureKind::RetriesExhausted,
            Error::Incomplete { .. } => FailureKind::Incomplete,
            Error::SizeMismatch { .. } => FailureKind::SizeMismatch,
            Error::HashMismatch { .. } => FailureKind::HashMismatch,
            Error::Persistence { .. } => FailureKind::Persistence,
            Error::Cancelled => FailureKind::Cancelled,
            Error::UnknownLength(_)
            | Error::Probe { .. }
            | Error::Reqwest { .. }
            | Error::Middleware { .. } => FailureKind::Http,
            Error::IOError { .. } => FailureKind::Io,
            Error::Internal(_) | Error::InvalidUrl(_) => FailureKind::Internal,
        }
    }

    /// Index of the chunk the error originated from, if any.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Error::RetriesExhausted { index, .. }
            | Error::Incomplete { index } => Some(*index),
            _ => None,
        }
    }

    /// Message including the chain of sources.
    pub fn detailed(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// Category of a terminal job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidSize,
    RetriesExhausted,
    Incomplete,
    SizeMismatch,
    HashMismatch,
    Persistence,
    Cancelled,
    Http,
    Io,
    Internal,
}

/// Structured reason attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    /// Error category.
    pub kind: FailureKind,
    /// Chunk that caused the failure, when the failure is chunk-local.
    pub chunk: Option<usize>,
    /// Human readable message, including error sources.
    pub message: String,
}

impl From<&Error> for FailureReason {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            chunk: error.chunk_index(),
            message: error.detailed(),
        }
    }
}

/// Result type alias for operations that can fail with a shardload error.
pub type Result<T> = std::result::Result<T, Error>;
