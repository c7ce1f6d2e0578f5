//! Where chunk bytes live between transfer and assembly.
//!
//! A [`ChunkSink`] maps chunks to part artifacts. Two layouts exist,
//! selected with [`DownloadMode`]:
//!
//! - [`PartFiles`]: one `<name>.<index>.part` file per chunk, concatenated
//!   at assembly time.
//! - [`SingleFile`]: one preallocated `<name>.part` file written at chunk
//!   offsets, renamed at assembly time.
//!
//! Part names derive only from the destination file name and the chunk
//! index, so a restarted job finds the parts of the previous run.

mod parts;
mod single;

pub use parts::PartFiles;
pub use single::SingleFile;

use crate::chunk::Chunk;

use async_trait::async_trait;
use flate2::Crc;
use std::fmt::Debug;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Reserved extension of part artifacts.
pub const PART_EXTENSION: &str = "part";

/// Layout of part artifacts on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadMode {
    /// One artifact per chunk.
    #[default]
    Parts,
    /// One preallocated artifact, chunks written at their offsets.
    SingleFile,
}

impl DownloadMode {
    /// Build the sink for a destination file name inside `dir`.
    pub fn sink(self, dir: &Path, file_name: &str) -> Arc<dyn ChunkSink> {
        match self {
            DownloadMode::Parts => Arc::new(PartFiles::new(dir, file_name)),
            DownloadMode::SingleFile => Arc::new(SingleFile::new(dir, file_name)),
        }
    }
}

/// Storage for the bytes of each chunk.
#[async_trait]
pub trait ChunkSink: Send + Sync + Debug {
    fn mode(&self) -> DownloadMode;

    /// Path of the artifact holding `chunk`.
    fn part_path(&self, chunk: &Chunk) -> PathBuf;

    /// Create whatever must exist before workers start writing.
    async fn prepare(&self, total_size: u64) -> io::Result<()>;

    /// Open a writer positioned at the first byte of `chunk`.
    ///
    /// Previous content of the chunk is discarded.
    async fn writer(&self, chunk: &Chunk) -> io::Result<PartWriter>;

    /// Check that the stored bytes of `chunk` are present and, when a
    /// checksum is given, that they still match it.
    async fn verify(&self, chunk: &Chunk, checksum: Option<u32>) -> io::Result<bool>;

    /// Produce the assembled artifact at `staging`, in chunk order.
    ///
    /// Returns the size of the staged file.
    async fn stage(&self, chunks: &[Chunk], staging: &Path) -> io::Result<u64>;

    /// Remove every part artifact of `chunks`.
    async fn discard(&self, chunks: &[Chunk]) -> io::Result<()>;
}

/// Writes one chunk's bytes while tracking their count and CRC32.
pub struct PartWriter {
    file: File,
    crc: Crc,
    written: u64,
}

impl Debug for PartWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartWriter")
            .field("written", &self.written)
            .finish()
    }
}

impl PartWriter {
    pub(crate) fn new(file: File) -> Self {
        Self {
            file,
            crc: Crc::new(),
            written: 0,
        }
    }

    pub async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes).await?;
        self.crc.update(bytes);
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush to storage and return the byte count and CRC32.
    pub async fn finish(mut self) -> io::Result<(u64, u32)> {
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok((self.written, self.crc.sum()))
    }
}

/// CRC32 of `len` bytes of `path` starting at `offset`.
///
/// `None` when the file is missing or too short.
pub(crate) async fn checksum_region(path: &Path, offset: u64, len: u64) -> io::Result<Option<u32>> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if file.metadata().await?.len() < offset + len {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(offset)).await?;
    let mut crc = Crc::new();
    let mut remaining = len;
    let mut buffer = vec![0u8; 64 * 1024];
    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;
        let read = file.read(&mut buffer[..want]).await?;
        if read == 0 {
            return Ok(None);
        }
        crc.update(&buffer[..read]);
        remaining -= read as u64;
    }
    Ok(Some(crc.sum()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_checksum_region_matches_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        let file = File::create(&path).await.unwrap();

        let mut writer = PartWriter::new(file);
        writer.write(b"hello ").await.unwrap();
        writer.write(b"world").await.unwrap();
        let (written, crc) = writer.finish().await.unwrap();

        assert_eq!(written, 11);
        assert_eq!(checksum_region(&path, 0, 11).await.unwrap(), Some(crc));
        assert_ne!(checksum_region(&path, 6, 5).await.unwrap(), Some(crc));
        assert_eq!(checksum_region(&path, 6, 10).await.unwrap(), None);
        assert_eq!(checksum_region(&dir.path().join("missing"), 0, 1).await.unwrap(), None);
    }

    #[test]
    fn test_default_mode_is_parts() {
        assert_eq!(DownloadMode::default(), DownloadMode::Parts);
        let sink = DownloadMode::SingleFile.sink(Path::new("/tmp"), "movie.mp4");
        assert_eq!(sink.mode(), DownloadMode::SingleFile);
    }
}
