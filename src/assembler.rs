//! Turns the part artifacts of a finished job into the destination file.

use crate::chunk::{covers, Chunk, ChunkState};
use crate::download::hash::verify_hash;
use crate::error::{Error, Result};
use crate::job::JobId;
use crate::resume::ResumeStore;
use crate::sink::ChunkSink;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Extension of the artifact being assembled next to the destination.
pub const STAGING_EXTENSION: &str = "assembling";

/// Assembles one job.
///
/// The destination only ever appears complete: bytes are staged next to
/// it and renamed into place once size and hash check out.
#[derive(Debug)]
pub struct Assembler {
    job: JobId,
    sink: Arc<dyn ChunkSink>,
    store: Arc<dyn ResumeStore>,
    destination: PathBuf,
    total_size: u64,
    hash: Option<String>,
}

impl Assembler {
    pub fn new(
        job: JobId,
        sink: Arc<dyn ChunkSink>,
        store: Arc<dyn ResumeStore>,
        destination: PathBuf,
        total_size: u64,
    ) -> Self {
        Self {
            job,
            sink,
            store,
            destination,
            total_size,
            hash: None,
        }
    }

    /// Expected MD5 or CRC32 of the assembled file.
    pub fn expected_hash(mut self, hash: Option<String>) -> Self {
        self.hash = hash;
        self
    }

    pub fn staging_path(&self) -> PathBuf {
        let mut name = self
            .destination
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(STAGING_EXTENSION);
        self.destination.with_file_name(name)
    }

    /// Concatenate the chunks in index order into the destination.
    ///
    /// Fails with [`Error::Incomplete`] unless every chunk is complete and
    /// the chunks cover the whole resource. When the staged file has the
    /// wrong size or hash, it is removed together with the parts and the
    /// resume state, and the destination is not created. On success the
    /// parts and the resume state are removed and the size returned.
    #[instrument(skip_all, fields(job = %self.job, destination = ?self.destination))]
    pub async fn assemble(&self, states: &[ChunkState]) -> Result<u64> {
        if let Some(state) = states.iter().find(|state| !state.is_complete()) {
            return Err(Error::Incomplete {
                index: state.chunk.index,
            });
        }
        let chunks: Vec<Chunk> = states.iter().map(|state| state.chunk).collect();
        if !covers(&chunks, self.total_size) {
            return Err(Error::Incomplete {
                index: first_gap(&chunks),
            });
        }

        if let Some(parent) = self.destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staging = self.staging_path();
        debug!(?staging, chunks = chunks.len(), "Staging parts");
        let size = self.sink.stage(&chunks, &staging).await?;

        if size != self.total_size {
            self.reject(&chunks, &staging).await;
            return Err(Error::SizeMismatch {
                expected: self.total_size,
                actual: size,
            });
        }

        if let Some(expected) = self.hash.as_deref() {
            if !verify_hash(&staging, Some(expected)).await? {
                self.reject(&chunks, &staging).await;
                return Err(Error::HashMismatch {
                    path: self.destination.clone(),
                    expected: expected.to_string(),
                });
            }
        }

        fs::rename(&staging, &self.destination).await?;
        if let Err(e) = self.sink.discard(&chunks).await {
            warn!(error = %e, "Could not remove part artifacts");
        }
        self.store.clear(&self.job).await?;

        info!(bytes = size, "Assembled");
        Ok(size)
    }

    /// Drop everything produced for a bad assembly so the next run starts over.
    async fn reject(&self, chunks: &[Chunk], staging: &Path) {
        warn!(?staging, "Discarding bad assembly");
        if let Err(e) = fs::remove_file(staging).await {
            debug!(error = %e, "Staging file already gone");
        }
        if let Err(e) = self.sink.discard(chunks).await {
            warn!(error = %e, "Could not remove part artifacts");
        }
        if let Err(e) = self.store.clear(&self.job).await {
            warn!(error = %e, "Could not clear resume state");
        }
    }
}

/// Index of the first chunk that breaks contiguous coverage.
fn first_gap(chunks: &[Chunk]) -> usize {
    let mut offset = 0;
    for (position, chunk) in chunks.iter().enumerate() {
        if chunk.index != position || chunk.start != offset {
            return position;
        }
        offset = chunk.end;
    }
    chunks.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path_sits_next_to_destination() {
        let assembler = Assembler::new(
            JobId::new("movie.mp4"),
            crate::sink::DownloadMode::Parts.sink(Path::new("/tmp/out"), "movie.mp4"),
            Arc::new(crate::resume::MemoryResumeStore::new()),
            PathBuf::from("/tmp/out/movie.mp4"),
            10,
        );
        assert_eq!(
            assembler.staging_path(),
            PathBuf::from("/tmp/out/movie.mp4.assembling")
        );
    }

    #[tokio::test]
    async fn test_assemble_requires_complete_chunks_then_orders_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let sink = crate::sink::DownloadMode::Parts.sink(dir.path(), "subs.srt");
        let destination = dir.path().join("subs.srt");
        let chunks = crate::chunk::plan_chunks(6, 3).unwrap();
        sink.prepare(6).await.unwrap();

        let assembler = Assembler::new(
            JobId::new("subs.srt"),
            sink.clone(),
            Arc::new(crate::resume::MemoryResumeStore::new()),
            destination.clone(),
            6,
        );

        let mut states: Vec<ChunkState> = chunks.iter().copied().map(ChunkState::pending).collect();
        let result = assembler.assemble(&states).await;
        assert!(matches!(result, Err(Error::Incomplete { index: 0 })));

        for (chunk, bytes) in chunks.iter().zip([b"abc", b"def"]).rev() {
            let mut writer = sink.writer(chunk).await.unwrap();
            writer.write(bytes).await.unwrap();
            let (_, crc) = writer.finish().await.unwrap();
            states[chunk.index] = ChunkState::complete(*chunk, Some(crc));
        }

        assert_eq!(assembler.assemble(&states).await.unwrap(), 6);
        assert_eq!(std::fs::read(&destination).unwrap(), b"abcdef");
        assert!(!sink.part_path(&chunks[0]).exists());
        assert!(!assembler.staging_path().exists());
    }

    #[test]
    fn test_first_gap() {
        let chunks = vec![
            Chunk { index: 0, start: 0, end: 5 },
            Chunk { index: 1, start: 6, end: 9 },
        ];
        assert_eq!(first_gap(&chunks), 1);
        assert_eq!(first_gap(&chunks[..1]), 1);
    }
}
