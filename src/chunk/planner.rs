//! Splitting a remote resource into byte-range chunks.
//!
//! # Examples
//!
//! ```rust
//! use shardload::chunk::plan_chunks;
//!
//! let chunks = plan_chunks(1000, 300)?;
//! let ranges: Vec<_> = chunks.iter().map(|c| (c.start, c.end)).collect();
//! assert_eq!(ranges, vec![(0, 300), (300, 600), (600, 900), (900, 1000)]);
//! # Ok::<(), shardload::Error>(())
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A contiguous byte range `[start, end)` of the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Position in the sequence. Defines assembly order.
    pub index: usize,
    /// First byte of the range.
    pub start: u64,
    /// One past the last byte of the range.
    pub end: u64,
}

impl Chunk {
    /// Number of bytes covered by the chunk.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the chunk covers no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Value of the `Range` header requesting exactly this chunk.
    ///
    /// HTTP ranges are inclusive, hence the `end - 1`.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end - 1)
    }
}

/// Lifecycle of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

/// Runtime state of one chunk while its job is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkState {
    pub chunk: Chunk,
    pub status: ChunkStatus,
    /// Bytes written by the last attempt.
    pub bytes_written: u64,
    /// Failed attempts so far.
    pub retries: u32,
    /// CRC32 of the part bytes, known once complete.
    pub checksum: Option<u32>,
}

impl ChunkState {
    /// A chunk that has not been attempted yet.
    pub fn pending(chunk: Chunk) -> Self {
        Self {
            chunk,
            status: ChunkStatus::Pending,
            bytes_written: 0,
            retries: 0,
            checksum: None,
        }
    }

    /// A chunk restored as already downloaded.
    pub fn complete(chunk: Chunk, checksum: Option<u32>) -> Self {
        Self {
            chunk,
            status: ChunkStatus::Complete,
            bytes_written: chunk.len(),
            retries: 0,
            checksum,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == ChunkStatus::Complete
    }
}

/// Compute the ordered chunks covering `[0, total_size)`.
///
/// The final chunk may be shorter than `chunk_size`. An empty resource
/// yields a single empty chunk so callers always have at least one chunk.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Result<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(Error::InvalidSize { chunk_size });
    }

    if total_size == 0 {
        return Ok(vec![Chunk {
            index: 0,
            start: 0,
            end: 0,
        }]);
    }

    let count = total_size.div_ceil(chunk_size);
    let chunks = (0..count)
        .map(|i| {
            let start = i * chunk_size;
            Chunk {
                index: i as usize,
                start,
                end: (start + chunk_size).min(total_size),
            }
        })
        .collect();

    Ok(chunks)
}

/// Check that `chunks` are ordered, disjoint and exactly cover `[0, total_size)`.
pub fn covers(chunks: &[Chunk], total_size: u64) -> bool {
    let mut offset = 0;
    for (position, chunk) in chunks.iter().enumerate() {
        if chunk.index != position || chunk.start != offset || chunk.end < chunk.start {
            return false;
        }
        offset = chunk.end;
    }
    !chunks.is_empty() && offset == total_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let err = plan_chunks(100, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidSize { chunk_size: 0 }));
    }

    #[test]
    fn test_empty_resource_has_single_empty_chunk() {
        let chunks = plan_chunks(0, 300).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
        assert!(covers(&chunks, 0));
    }

    #[test]
    fn test_last_chunk_is_short() {
        let chunks = plan_chunks(1000, 300).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3].start, 900);
        assert_eq!(chunks[3].len(), 100);
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = plan_chunks(900, 300).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 300));
    }

    #[test]
    fn test_chunk_larger_than_resource() {
        let chunks = plan_chunks(10, 4096).unwrap();
        assert_eq!(chunks, vec![Chunk { index: 0, start: 0, end: 10 }]);
    }

    #[test]
    fn test_coverage_over_many_sizes() {
        for total in [1u64, 2, 7, 299, 300, 301, 1000, 4097, 65_536] {
            for size in [1u64, 3, 64, 300, 1024, 100_000] {
                let chunks = plan_chunks(total, size).unwrap();
                assert!(covers(&chunks, total), "total={total} size={size}");
                assert!(chunks.windows(2).all(|w| w[0].end == w[1].start));
                assert!(chunks.iter().all(|c| c.len() <= size && !c.is_empty()));
            }
        }
    }

    #[test]
    fn test_covers_detects_gaps() {
        let chunks = vec![
            Chunk { index: 0, start: 0, end: 10 },
            Chunk { index: 1, start: 11, end: 20 },
        ];
        assert!(!covers(&chunks, 20));
        assert!(!covers(&chunks[..1], 20));
        assert!(!covers(&[], 0));
    }

    #[test]
    fn test_range_header_is_inclusive() {
        let chunk = Chunk { index: 1, start: 300, end: 600 };
        assert_eq!(chunk.range_header(), "bytes=300-599");
    }
}
