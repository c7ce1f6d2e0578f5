//! Resume store contract and the state it persists.

use crate::chunk::{Chunk, ChunkState, ChunkStatus};
use crate::error::Result;
use crate::job::JobId;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// The resource layout a resume state was recorded against.
///
/// Stored parts are only reusable when the layout still matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub url: String,
    pub total_size: u64,
    pub chunk_size: u64,
}

impl Layout {
    /// Whether a run asking for `chunk_size` can reuse this layout.
    ///
    /// A single-chunk layout recorded for a server without range support
    /// fits any requested chunk size.
    pub fn fits(&self, chunk_size: u64) -> bool {
        self.chunk_size == chunk_size || self.chunk_size == self.total_size.max(1)
    }
}

/// Persisted state of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub start: u64,
    pub end: u64,
    pub status: ChunkStatus,
    pub bytes_written: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
}

impl ChunkRecord {
    /// Whether the record describes `chunk` and marks it complete.
    pub fn completes(&self, chunk: &Chunk) -> bool {
        self.status == ChunkStatus::Complete
            && self.start == chunk.start
            && self.end == chunk.end
            && self.bytes_written == chunk.len()
    }
}

impl From<&ChunkState> for ChunkRecord {
    fn from(state: &ChunkState) -> Self {
        Self {
            start: state.chunk.start,
            end: state.chunk.end,
            status: state.status,
            bytes_written: state.bytes_written,
            checksum: state.checksum,
        }
    }
}

/// Everything known about a job from previous runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub chunks: BTreeMap<usize, ChunkRecord>,
}

impl ResumeState {
    pub fn is_empty(&self) -> bool {
        self.layout.is_none() && self.chunks.is_empty()
    }

    /// Indices recorded as complete.
    pub fn completed(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks
            .iter()
            .filter(|(_, record)| record.status == ChunkStatus::Complete)
            .map(|(index, _)| *index)
    }
}

/// Durable per-chunk progress, keyed by job.
///
/// Implementations must tolerate concurrent `save` calls for different
/// chunk indices of the same job without losing any of them, and must not
/// return from `save` before the record is durable.
#[async_trait]
pub trait ResumeStore: Send + Sync + Debug {
    /// State recorded for `job`; empty when nothing was recorded.
    async fn load(&self, job: &JobId) -> Result<ResumeState>;

    /// Record the layout of `job`, dropping chunk records of any other layout.
    async fn save_layout(&self, job: &JobId, layout: Layout) -> Result<()>;

    /// Record the state of one chunk.
    async fn save(&self, job: &JobId, index: usize, record: ChunkRecord) -> Result<()>;

    /// Forget everything about `job`.
    async fn clear(&self, job: &JobId) -> Result<()>;
}

/// Apply `save_layout` semantics to an in-memory state.
pub(crate) fn apply_layout(state: &mut ResumeState, layout: Layout) {
    if state.layout.as_ref() != Some(&layout) {
        state.chunks.clear();
    }
    state.layout = Some(layout);
}
