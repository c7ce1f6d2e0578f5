use super::store::{apply_layout, ChunkRecord, Layout, ResumeState, ResumeStore};
use crate::error::Result;
use crate::job::JobId;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local resume store.
///
/// Clones share the same state, which lets a caller keep a handle to
/// inspect what a downloader recorded.
#[derive(Debug, Clone, Default)]
pub struct MemoryResumeStore {
    states: Arc<Mutex<HashMap<JobId, ResumeState>>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `job` without going through the async trait.
    pub fn snapshot(&self, job: &JobId) -> ResumeState {
        self.lock().get(job).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, ResumeState>> {
        // The map holds plain data, so a poisoned lock is still consistent.
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn load(&self, job: &JobId) -> Result<ResumeState> {
        Ok(self.snapshot(job))
    }

    async fn save_layout(&self, job: &JobId, layout: Layout) -> Result<()> {
        apply_layout(self.lock().entry(job.clone()).or_default(), layout);
        Ok(())
    }

    async fn save(&self, job: &JobId, index: usize, record: ChunkRecord) -> Result<()> {
        self.lock()
            .entry(job.clone())
            .or_default()
            .chunks
            .insert(index, record);
        Ok(())
    }

    async fn clear(&self, job: &JobId) -> Result<()> {
        self.lock().remove(job);
        Ok(())
    }
}
