use super::store::{apply_layout, ChunkRecord, Layout, ResumeState, ResumeStore};
use crate::error::{Error, Result};
use crate::job::JobId;

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Resume store keeping one `<job>.resume.json` document per job.
///
/// Each save rewrites the job's document through a temporary file that is
/// synced and renamed into place, so a crash leaves either the previous or
/// the new document. Saves are serialised by a single async lock.
#[derive(Debug)]
pub struct JsonResumeStore {
    dir: PathBuf,
    cache: Mutex<HashMap<JobId, ResumeState>>,
}

impl JsonResumeStore {
    pub const EXTENSION: &'static str = "resume.json";

    /// Store documents inside `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `job`.
    pub fn path(&self, job: &JobId) -> PathBuf {
        self.dir.join(format!("{}.{}", job, Self::EXTENSION))
    }

    async fn read(&self, job: &JobId) -> Result<ResumeState> {
        let path = self.path(job);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ResumeState::default()),
            Err(e) => return Err(Error::persistence(format!("reading {:?}", path), e)),
        };

        match serde_json::from_slice(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                // A torn or foreign document only costs a re-download.
                warn!(?path, error = %e, "Ignoring unreadable resume state");
                Ok(ResumeState::default())
            }
        }
    }

    async fn write(&self, job: &JobId, state: &ResumeState) -> Result<()> {
        let path = self.path(job);
        let tmp = path.with_extension("json.tmp");
        let encoded = serde_json::to_vec_pretty(state).map_err(|e| Error::Persistence {
            message: format!("encoding resume state for {}: {}", job, e),
            source: None,
        })?;

        let persist = async {
            fs::create_dir_all(&self.dir).await?;
            let mut file = File::create(&tmp).await?;
            file.write_all(&encoded).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &path).await
        };
        persist
            .await
            .map_err(|e| Error::persistence(format!("writing {:?}", path), e))
    }

    /// Run `update` against the cached state of `job` and persist the result.
    async fn update<F>(&self, job: &JobId, update: F) -> Result<()>
    where
        F: FnOnce(&mut ResumeState) + Send,
    {
        let mut cache = self.cache.lock().await;
        if !cache.contains_key(job) {
            let state = self.read(job).await?;
            cache.insert(job.clone(), state);
        }
        let Some(state) = cache.get_mut(job) else {
            return Err(Error::Internal(format!("resume cache lost {}", job)));
        };
        update(state);
        self.write(job, state).await
    }
}

#[async_trait]
impl ResumeStore for JsonResumeStore {
    async fn load(&self, job: &JobId) -> Result<ResumeState> {
        let mut cache = self.cache.lock().await;
        let state = self.read(job).await?;
        cache.insert(job.clone(), state.clone());
        Ok(state)
    }

    async fn save_layout(&self, job: &JobId, layout: Layout) -> Result<()> {
        self.update(job, |state| apply_layout(state, layout)).await
    }

    async fn save(&self, job: &JobId, index: usize, record: ChunkRecord) -> Result<()> {
        self.update(job, |state| {
            state.chunks.insert(index, record);
        })
        .await
    }

    async fn clear(&self, job: &JobId) -> Result<()> {
        let mut cache = self.cache.lock().await;
        cache.remove(job);
        let path = self.path(job);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(?path, "Removed resume state");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!("removing {:?}", path), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkStatus;
    use std::sync::Arc;

    fn complete(start: u64, end: u64) -> ChunkRecord {
        ChunkRecord {
            start,
            end,
            status: ChunkStatus::Complete,
            bytes_written: end - start,
            checksum: None,
        }
    }

    #[tokio::test]
    async fn test_missing_state_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResumeStore::new(dir.path());
        let state = store.load(&JobId::new("nothing.bin")).await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_saves_survive_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobId::new("movie.mp4");
        {
            let store = JsonResumeStore::new(dir.path());
            store
                .save_layout(
                    &job,
                    Layout {
                        url: "http://host/movie.mp4".into(),
                        total_size: 20,
                        chunk_size: 10,
                    },
                )
                .await
                .unwrap();
            store.save(&job, 1, complete(10, 20)).await.unwrap();
        }

        let reopened = JsonResumeStore::new(dir.path());
        let state = reopened.load(&job).await.unwrap();
        assert_eq!(state.layout.unwrap().total_size, 20);
        assert_eq!(state.chunks.get(&1), Some(&complete(10, 20)));
        assert!(reopened.path(&job).ends_with("movie.mp4.resume.json"));
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_every_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonResumeStore::new(dir.path()));
        let job = JobId::new("big.iso");

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let store = store.clone();
                let job = job.clone();
                tokio::spawn(async move {
                    store
                        .save(&job, i as usize, complete(i * 10, i * 10 + 10))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = JsonResumeStore::new(dir.path()).load(&job).await.unwrap();
        assert_eq!(state.chunks.len(), 16);
    }

    #[tokio::test]
    async fn test_clear_removes_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResumeStore::new(dir.path());
        let job = JobId::new("a.srt");
        store.save(&job, 0, complete(0, 1)).await.unwrap();
        assert!(store.path(&job).exists());

        store.clear(&job).await.unwrap();
        assert!(!store.path(&job).exists());
        assert!(store.load(&job).await.unwrap().is_empty());
        store.clear(&job).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_document_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResumeStore::new(dir.path());
        let job = JobId::new("x.bin");
        std::fs::write(store.path(&job), b"{ not json").unwrap();
        assert!(store.load(&job).await.unwrap().is_empty());
    }
}
