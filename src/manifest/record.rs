//! A single manifest entry, keyed by content digest.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::is_valid_version;
use super::store::ManifestError;
use crate::download::event::is_valid_digest;
use crate::download::DownloadRecord;
use crate::source::Source;

/// Durable record of one retrieved artifact.
///
/// The checksum doubles as the record's key in the manifest map; the two
/// must agree at all times, and a loaded manifest that violates this is
/// rejected rather than repaired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub source_id: String,
    pub dataset: String,
    pub checksum: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub file_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_downloaded: Option<DateTime<Utc>>,
}

impl ManifestRecord {
    /// Build a record from a verified download event plus source metadata.
    pub fn from_event(
        source: &Source,
        event: &DownloadRecord,
        version: &str,
        etag: Option<String>,
    ) -> Result<Self, ManifestError> {
        let record = Self {
            source_id: source.source_id.clone(),
            dataset: source.dataset.clone(),
            checksum: event.sha256.clone(),
            file_path: event.file_path.clone(),
            file_size: event.file_size_bytes,
            file_version: version.to_string(),
            etag,
            ts_downloaded: Some(event.ts_download_completed),
        };
        record.validate()?;
        Ok(record)
    }

    /// Field-format validation, applied both on construction and on load.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if !is_valid_digest(&self.checksum) {
            return Err(ManifestError::MalformedChecksum {
                checksum: self.checksum.clone(),
            });
        }
        if !is_valid_version(&self.file_version) {
            return Err(ManifestError::InvalidVersion {
                version: self.file_version.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "a665a45920422f9d417e4867efdc4fb8a04a1f3fff1fa07e998e86f7f7a27ae3";

    fn record() -> ManifestRecord {
        ManifestRecord {
            source_id: "spansh".to_string(),
            dataset: "systems".to_string(),
            checksum: DIGEST.to_string(),
            file_path: PathBuf::from("/data/downloads/2026/03/dump.json.gz"),
            file_size: 10240,
            file_version: "1.0".to_string(),
            etag: None,
            ts_downloaded: Some(Utc::now()),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        let mut r = record();
        r.checksum = "not-a-digest".to_string();
        assert!(matches!(
            r.validate().unwrap_err(),
            ManifestError::MalformedChecksum { .. }
        ));

        // Uppercase hex is also rejected; digests are stored lowercase.
        let mut r = record();
        r.checksum = DIGEST.to_uppercase();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let mut r = record();
        r.file_version = "1.0.0".to_string();
        assert!(matches!(
            r.validate().unwrap_err(),
            ManifestError::InvalidVersion { .. }
        ));
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let mut r = record();
        r.etag = None;
        r.ts_downloaded = None;

        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("etag"));
        assert!(!json.contains("ts_downloaded"));
    }
}
