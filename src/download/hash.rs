//! Hash verification of finished files.
//!
//! Two formats are recognised from the expected value itself:
//!
//! - **MD5**: 32 hexadecimal characters (e.g. `"d41d8cd98f00b204e9800998ecf8427e"`)
//! - **CRC32**: a decimal `u32` (e.g. `"1127497"`)
//!
//! # Examples
//!
//! ```rust
//! use shardload::download::hash::{detect_hash_type, HashType};
//!
//! assert_eq!(detect_hash_type("d41d8cd98f00b204e9800998ecf8427e"), Some(HashType::Md5));
//! assert_eq!(detect_hash_type("1127497"), Some(HashType::Crc32));
//! assert_eq!(detect_hash_type("invalid"), None);
//! ```

use crate::error::{Error, Result};

use bacy::{calculate_crc32, calculate_md5};
use std::path::{Path, PathBuf};
use tokio::task;

/// Supported hash types for file verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashType {
    Md5,
    Crc32,
}

/// Detect the hash type from the format of `hash`.
///
/// MD5 hashes are 32 hex characters; anything parsing as a `u32` is a CRC32.
pub fn detect_hash_type(hash: &str) -> Option<HashType> {
    if hash.len() == 32 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(HashType::Md5)
    } else if hash.parse::<u32>().is_ok() {
        Some(HashType::Crc32)
    } else {
        None
    }
}

/// Verify the hash of a local file against an expected value.
///
/// * `Ok(true)` if the hashes match or no hash is expected
/// * `Ok(false)` if the file is missing, the hashes differ, or the expected
///   value has no recognised format
/// * `Err` if hashing the file failed
///
/// Hashing runs on the blocking thread pool.
///
/// ```no_run
/// use shardload::download::hash::verify_hash;
/// use std::path::Path;
///
/// # async fn example() -> shardload::Result<()> {
/// let ok = verify_hash(Path::new("movie.mp4"), Some("400a0698b5b8a84fc57ad96e0c3b57c3")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn verify_hash(file_path: &Path, expected_hash: Option<&str>) -> Result<bool> {
    let Some(expected_hash) = expected_hash else {
        return Ok(true);
    };

    if !file_path.exists() {
        return Ok(false);
    }

    let Some(hash_type) = detect_hash_type(expected_hash) else {
        return Ok(false);
    };

    let path = PathBuf::from(file_path);
    let expected = expected_hash.to_lowercase();
    task::spawn_blocking(move || match hash_type {
        HashType::Md5 => calculate_md5(path.clone())
            .map(|calculated| calculated.to_lowercase() == expected)
            .map_err(|e| Error::Internal(format!("hashing {:?}: {}", path, e))),
        HashType::Crc32 => calculate_crc32(path.clone())
            .map(|calculated| Some(calculated) == expected.parse::<u32>().ok())
            .map_err(|e| Error::Internal(format!("hashing {:?}: {}", path, e))),
    })
    .await
    .map_err(|e| Error::Internal(format!("hash task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("test_file.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "test content").unwrap();
        path
    }

    #[test]
    fn test_detect_hash_type_invalid() {
        assert_eq!(detect_hash_type("invalid_hash"), None);
        // Too short for MD5
        assert_eq!(detect_hash_type("400a0698b5b8a84fc57ad96e0c3b57"), None);
        // Non-hex character
        assert_eq!(detect_hash_type("400a0698b5b8a84fc57ad96e0c3b57g3"), None);
    }

    #[tokio::test]
    async fn test_verify_hash_without_expected_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_file(&dir);
        assert!(verify_hash(&path, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_hash_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bin");
        assert!(!verify_hash(&path, Some("400a0698b5b8a84fc57ad96e0c3b57c3")).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_hash_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_file(&dir);
        assert!(!verify_hash(&path, Some("not_a_hash")).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_hash_md5() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_file(&dir);
        let actual = calculate_md5(path.clone()).unwrap();

        assert!(verify_hash(&path, Some(&actual)).await.unwrap());
        assert!(verify_hash(&path, Some(&actual.to_uppercase())).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_hash_crc32() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_file(&dir);
        let actual = calculate_crc32(path.clone()).unwrap();

        assert!(verify_hash(&path, Some(&actual.to_string())).await.unwrap());
        let wrong = actual.wrapping_add(1).to_string();
        assert!(!verify_hash(&path, Some(&wrong)).await.unwrap());
    }
}
