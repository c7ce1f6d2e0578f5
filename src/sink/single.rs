use super::{checksum_region, ChunkSink, DownloadMode, PartWriter, PART_EXTENSION};
use crate::chunk::Chunk;

use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncSeekExt;

/// One preallocated artifact, `<dir>/<file name>.part`, written at offsets.
#[derive(Debug, Clone)]
pub struct SingleFile {
    dir: PathBuf,
    path: PathBuf,
}

impl SingleFile {
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            path: dir.join(format!("{}.{}", file_name, PART_EXTENSION)),
        }
    }
}

#[async_trait]
impl ChunkSink for SingleFile {
    fn mode(&self) -> DownloadMode {
        DownloadMode::SingleFile
    }

    fn part_path(&self, _chunk: &Chunk) -> PathBuf {
        self.path.clone()
    }

    async fn prepare(&self, total_size: u64) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .await?;
        if file.metadata().await?.len() != total_size {
            file.set_len(total_size).await?;
        }
        Ok(())
    }

    async fn writer(&self, chunk: &Chunk) -> io::Result<PartWriter> {
        let mut file = OpenOptions::new().write(true).open(&self.path).await?;
        file.seek(SeekFrom::Start(chunk.start)).await?;
        Ok(PartWriter::new(file))
    }

    async fn verify(&self, chunk: &Chunk, checksum: Option<u32>) -> io::Result<bool> {
        let stored = checksum_region(&self.path, chunk.start, chunk.len()).await?;
        Ok(match (stored, checksum) {
            (None, _) => false,
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
        })
    }

    async fn stage(&self, _chunks: &[Chunk], staging: &Path) -> io::Result<u64> {
        fs::rename(&self.path, staging).await?;
        Ok(fs::metadata(staging).await?.len())
    }

    async fn discard(&self, _chunks: &[Chunk]) -> io::Result<()> {
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
