//! Durable manifest storage with atomic commits.
//!
//! One JSON document per (process, version) pair, written via temp-file +
//! atomic rename so a crash or concurrent reader never observes a torn
//! manifest. The store assumes a single writer per (process, version);
//! atomic rename protects readers but not concurrent read-modify-write.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::metadata::{is_valid_version, ManifestMetadata, Process};
use super::record::ManifestRecord;
use crate::download::DownloadRecord;
use crate::paths;
use crate::source::Source;

/// Failure loading, validating, or committing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest key '{key}' does not match record checksum '{checksum}'")]
    KeyMismatch { key: String, checksum: String },

    #[error("malformed checksum in manifest record: '{checksum}'")]
    MalformedChecksum { checksum: String },

    #[error("invalid version '{version}': expected major.minor")]
    InvalidVersion { version: String },

    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The aggregate of metadata + records for one (process, version) pair.
///
/// Obtained only through [`ManifestStore::load`]; callers never assemble one
/// by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: ManifestMetadata,
    pub records: BTreeMap<String, ManifestRecord>,
}

impl Manifest {
    pub fn get(&self, checksum: &str) -> Option<&ManifestRecord> {
        self.records.get(checksum)
    }

    pub fn contains(&self, checksum: &str) -> bool {
        self.records.contains_key(checksum)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Owns manifest persistence for a manifests directory and pipeline version.
///
/// Built once at startup and passed by reference to whatever needs it:
/// an explicit handle instead of hidden global registries.
#[derive(Debug)]
pub struct ManifestStore {
    manifests_root: PathBuf,
    version: String,
}

impl ManifestStore {
    pub fn new(manifests_root: PathBuf, version: String) -> Result<Self, ManifestError> {
        if !is_valid_version(&version) {
            return Err(ManifestError::InvalidVersion { version });
        }
        Ok(Self {
            manifests_root,
            version,
        })
    }

    /// Deterministic path of the manifest for a process.
    pub fn manifest_path(&self, process: Process) -> PathBuf {
        paths::manifest_path(&self.manifests_root, process, &self.version)
    }

    /// Load the manifest for a process, or initialize a fresh empty one in
    /// memory when no file exists yet (no I/O for the fresh case).
    ///
    /// Loaded manifests are validated: every record's map key must equal its
    /// own checksum field, and record fields must be well-formed. A manifest
    /// that fails validation is rejected, never silently repaired.
    pub async fn load(&self, process: Process) -> Result<Manifest, ManifestError> {
        let path = self.manifest_path(process);

        if !path.exists() {
            debug!(path = %path.display(), "no manifest on disk, starting fresh");
            return Ok(Manifest {
                metadata: ManifestMetadata::new(process, self.version.clone()),
                records: BTreeMap::new(),
            });
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.clone(),
                source,
            })?;

        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
                path: path.clone(),
                source,
            })?;

        for (key, record) in &manifest.records {
            record.validate()?;
            if key != &record.checksum {
                return Err(ManifestError::KeyMismatch {
                    key: key.clone(),
                    checksum: record.checksum.clone(),
                });
            }
        }

        debug!(
            path = %path.display(),
            records = manifest.records.len(),
            "manifest loaded"
        );

        Ok(manifest)
    }

    /// Convert a download event into a manifest record, insert it keyed by
    /// digest (last write wins), sync the metadata, and commit.
    pub async fn add_record(
        &self,
        manifest: &mut Manifest,
        source: &Source,
        event: &DownloadRecord,
        etag: Option<String>,
    ) -> Result<(), ManifestError> {
        let record = ManifestRecord::from_event(source, event, &self.version, etag)?;

        manifest.records.insert(record.checksum.clone(), record);
        manifest.metadata.sync_stats(manifest.records.len());

        self.save(manifest).await?;

        info!(
            process = %manifest.metadata.process,
            sha256 = %event.sha256,
            total_records = manifest.metadata.total_records,
            "manifest record committed"
        );

        Ok(())
    }

    /// Commit the manifest atomically: serialize to a temp file in the same
    /// directory, then rename over the final path.
    pub async fn save(&self, manifest: &Manifest) -> Result<(), ManifestError> {
        let path = self.manifest_path(manifest.metadata.process);

        tokio::fs::create_dir_all(&self.manifests_root)
            .await
            .map_err(|source| ManifestError::Write {
                path: path.clone(),
                source,
            })?;

        let json = serde_json::to_string_pretty(manifest).map_err(|source| {
            ManifestError::Write {
                path: path.clone(),
                source: source.into(),
            }
        })?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.manifests_root).map_err(
            |source| ManifestError::Write {
                path: path.clone(),
                source,
            },
        )?;

        temp.write_all(json.as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|source| ManifestError::Write {
                path: path.clone(),
                source,
            })?;

        temp.persist(&path)
            .map_err(|e| ManifestError::Write {
                path: path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use tempfile::TempDir;

    const DIGEST: &str = "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";

    #[test]
    fn test_store_rejects_bad_version() {
        let err = ManifestStore::new(PathBuf::from("/tmp"), "1.0.0".to_string()).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidVersion { .. }));
    }

    #[tokio::test]
    async fn test_fresh_manifest_has_no_file() {
        let dir = TempDir::new().unwrap();
        let store =
            ManifestStore::new(dir.path().to_path_buf(), "1.0".to_string()).unwrap();

        let manifest = store.load(Process::Downloads).await.unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.metadata.total_records, 0);

        // Loading a fresh manifest must not create the file.
        assert!(!store.manifest_path(Process::Downloads).exists());
    }

    #[tokio::test]
    async fn test_load_rejects_key_mismatch() {
        let dir = TempDir::new().unwrap();
        let store =
            ManifestStore::new(dir.path().to_path_buf(), "1.0".to_string()).unwrap();
        let path = store.manifest_path(Process::Downloads);

        let mut records = Map::new();
        records.insert(
            // Key disagrees with the record's own checksum field.
            "b".repeat(64),
            serde_json::json!({
                "source_id": "spansh",
                "dataset": "systems",
                "checksum": DIGEST,
                "file_path": "/data/dump.json.gz",
                "file_size": 10240,
                "file_version": "1.0"
            }),
        );
        let doc = serde_json::json!({
            "metadata": {
                "process": "downloads",
                "version": "1.0",
                "total_records": 1,
                "ts_created": "2026-03-07T14:30:05Z",
                "ts_updated": null
            },
            "records": records
        });
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let err = store.load(Process::Downloads).await.unwrap_err();
        assert!(matches!(err, ManifestError::KeyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store =
            ManifestStore::new(dir.path().to_path_buf(), "1.0".to_string()).unwrap();

        let mut manifest = store.load(Process::Downloads).await.unwrap();
        manifest.records.insert(
            DIGEST.to_string(),
            ManifestRecord {
                source_id: "spansh".to_string(),
                dataset: "systems".to_string(),
                checksum: DIGEST.to_string(),
                file_path: PathBuf::from("/data/dump.json.gz"),
                file_size: 10240,
                file_version: "1.0".to_string(),
                etag: Some("\"abc\"".to_string()),
                ts_downloaded: None,
            },
        );
        manifest.metadata.sync_stats(manifest.records.len());
        store.save(&manifest).await.unwrap();

        let reloaded = store.load(Process::Downloads).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.metadata.total_records, 1);
        let record = reloaded.get(DIGEST).unwrap();
        assert_eq!(record.source_id, "spansh");
        assert_eq!(record.etag.as_deref(), Some("\"abc\""));
    }

    #[tokio::test]
    async fn test_save_leaves_no_partial_target() {
        let dir = TempDir::new().unwrap();
        let store =
            ManifestStore::new(dir.path().to_path_buf(), "1.0".to_string()).unwrap();

        let manifest = store.load(Process::Downloads).await.unwrap();
        store.save(&manifest).await.unwrap();
        store.save(&manifest).await.unwrap();

        // After any number of commits the target parses as complete JSON.
        let content =
            std::fs::read_to_string(store.manifest_path(Process::Downloads)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed.get("metadata").is_some());
        assert!(parsed.get("records").is_some());
    }
}
