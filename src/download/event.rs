//! The verifiable result of a completed download.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a download result could not be promoted to a [`DownloadRecord`].
///
/// Any of these means the download is untrusted: the partially or wrongly
/// written file must not reach the manifest.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("downloaded file does not exist: {path}")]
    MissingFile { path: PathBuf },

    #[error("downloaded file is empty: {path}")]
    EmptyFile { path: PathBuf },

    #[error("malformed sha256 digest (expected 64 lowercase hex chars): {digest}")]
    MalformedDigest { digest: String },

    #[error("failed to stat downloaded file {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable record of one completed transfer.
///
/// Construction validates the integrity invariants: the file exists on disk,
/// its size is positive, and the digest is exactly 64 lowercase hex chars.
/// The size is read from the filesystem, so it always describes the bytes
/// actually persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub file_path: PathBuf,
    pub file_size_bytes: u64,
    pub sha256: String,
    pub ts_download_started: DateTime<Utc>,
    pub ts_download_completed: DateTime<Utc>,
    pub download_regime: String,
}

impl DownloadRecord {
    pub fn new(
        file_path: &Path,
        sha256: String,
        ts_download_started: DateTime<Utc>,
        ts_download_completed: DateTime<Utc>,
        download_regime: String,
    ) -> Result<Self, RecordError> {
        if !is_valid_digest(&sha256) {
            return Err(RecordError::MalformedDigest { digest: sha256 });
        }

        let metadata = match std::fs::metadata(file_path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecordError::MissingFile {
                    path: file_path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(RecordError::Stat {
                    path: file_path.to_path_buf(),
                    source: e,
                })
            }
        };

        let file_size_bytes = metadata.len();
        if file_size_bytes == 0 {
            return Err(RecordError::EmptyFile {
                path: file_path.to_path_buf(),
            });
        }

        Ok(Self {
            file_path: file_path.to_path_buf(),
            file_size_bytes,
            sha256,
            ts_download_started,
            ts_download_completed,
            download_regime,
        })
    }
}

/// Exactly 64 lowercase hex characters. Shared with manifest record
/// validation so both ends of the pipeline enforce the same digest format.
pub(crate) fn is_valid_digest(digest: &str) -> bool {
    digest.len() == 64
        && digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const DIGEST: &str = "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_record_construction() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "dump.json.gz", b"payload bytes");

        let record = DownloadRecord::new(
            &path,
            DIGEST.to_string(),
            Utc::now(),
            Utc::now(),
            "gzip".to_string(),
        )
        .unwrap();

        assert_eq!(record.file_size_bytes, 13);
        assert_eq!(record.sha256, DIGEST);
        assert_eq!(record.download_regime, "gzip");
    }

    #[test]
    fn test_record_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never-written.gz");

        let err = DownloadRecord::new(
            &path,
            DIGEST.to_string(),
            Utc::now(),
            Utc::now(),
            "gzip".to_string(),
        )
        .unwrap_err();

        assert!(matches!(err, RecordError::MissingFile { .. }));
    }

    #[test]
    fn test_record_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.gz", b"");

        let err = DownloadRecord::new(
            &path,
            DIGEST.to_string(),
            Utc::now(),
            Utc::now(),
            "gzip".to_string(),
        )
        .unwrap_err();

        assert!(matches!(err, RecordError::EmptyFile { .. }));
    }

    #[test]
    fn test_record_rejects_malformed_digest() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "dump.gz", b"payload");

        for bad in [
            "short",
            "A665A45920422F9D417E4867EFDC4FB8A04A1F3FFF1FA07E998E86F7F7A27AE3",
            "zzzza45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3",
        ] {
            let err = DownloadRecord::new(
                &path,
                bad.to_string(),
                Utc::now(),
                Utc::now(),
                "gzip".to_string(),
            )
            .unwrap_err();
            assert!(matches!(err, RecordError::MalformedDigest { .. }));
        }
    }
}
