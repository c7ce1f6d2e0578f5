//! Global cap on concurrent connections.
//!
//! The task limit bounds concurrency inside one job; the limiter bounds it
//! across every job sharing a [`Transport`](super::Transport), so running
//! many jobs at once cannot open an unbounded number of sockets.

use crate::error::TransferError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Semaphore-backed connection limiter.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConnectionLimiter {
    /// Create a limiter allowing `capacity` concurrent connections.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Maximum number of concurrent connections.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Connection slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a connection slot, giving up after `timeout`.
    pub async fn acquire(&self, timeout: Duration) -> Result<OwnedSemaphorePermit, TransferError> {
        match tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            // The semaphore is never closed, so only the timeout is reachable here.
            Ok(Err(_)) | Err(_) => Err(TransferError::PoolTimeout(timeout)),
        }
    }
}
