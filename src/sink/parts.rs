use super::{checksum_region, ChunkSink, DownloadMode, PartWriter, PART_EXTENSION};
use crate::chunk::Chunk;

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// One part artifact per chunk: `<dir>/<file name>.<index>.part`.
#[derive(Debug, Clone)]
pub struct PartFiles {
    dir: PathBuf,
    file_name: String,
}

impl PartFiles {
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            file_name: file_name.to_string(),
        }
    }
}

#[async_trait]
impl ChunkSink for PartFiles {
    fn mode(&self) -> DownloadMode {
        DownloadMode::Parts
    }

    fn part_path(&self, chunk: &Chunk) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.{}",
            self.file_name, chunk.index, PART_EXTENSION
        ))
    }

    async fn prepare(&self, _total_size: u64) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    async fn writer(&self, chunk: &Chunk) -> io::Result<PartWriter> {
        let file = File::create(self.part_path(chunk)).await?;
        Ok(PartWriter::new(file))
    }

    async fn verify(&self, chunk: &Chunk, checksum: Option<u32>) -> io::Result<bool> {
        let path = self.part_path(chunk);
        let len = match fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if len != chunk.len() {
            return Ok(false);
        }
        match checksum {
            Some(expected) => Ok(checksum_region(&path, 0, len).await? == Some(expected)),
            None => Ok(true),
        }
    }

    async fn stage(&self, chunks: &[Chunk], staging: &Path) -> io::Result<u64> {
        let mut output = File::create(staging).await?;
        let mut size = 0;
        for chunk in chunks {
            let mut part = File::open(self.part_path(chunk)).await?;
            size += tokio::io::copy(&mut part, &mut output).await?;
        }
        output.flush().await?;
        output.sync_all().await?;
        debug!(?staging, size, parts = chunks.len(), "Concatenated part artifacts");
        Ok(size)
    }

    async fn discard(&self, chunks: &[Chunk]) -> io::Result<()> {
        for chunk in chunks {
            match fs::remove_file(self.part_path(chunk)).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
