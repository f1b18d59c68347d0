//! Manifest header: process identity, version, and audit timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage a manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    Downloads,
    Processing,
    Ingestion,
    Validation,
}

impl Process {
    pub fn as_str(&self) -> &'static str {
        match self {
            Process::Downloads => "downloads",
            Process::Processing => "processing",
            Process::Ingestion => "ingestion",
            Process::Validation => "validation",
        }
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Process {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "downloads" => Ok(Process::Downloads),
            "processing" => Ok(Process::Processing),
            "ingestion" => Ok(Process::Ingestion),
            "validation" => Ok(Process::Validation),
            _ => anyhow::bail!("Unknown process: {}", s),
        }
    }
}

/// Check a pipeline version string against the `major.minor` pattern.
pub fn is_valid_version(version: &str) -> bool {
    match version.split_once('.') {
        Some((major, minor)) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && minor.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Audit header persisted at the top of every manifest file.
///
/// `total_records` tracks the record map; it is re-synced on every commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub process: Process,
    pub version: String,
    pub total_records: u64,
    pub ts_created: DateTime<Utc>,
    pub ts_updated: Option<DateTime<Utc>>,
}

impl ManifestMetadata {
    pub fn new(process: Process, version: String) -> Self {
        Self {
            process,
            version,
            total_records: 0,
            ts_created: Utc::now(),
            ts_updated: None,
        }
    }

    /// Refresh the updated timestamp. Called on every mutating operation.
    pub fn touch(&mut self) {
        self.ts_updated = Some(Utc::now());
    }

    /// Sync `total_records` with the record map and touch the timestamp.
    pub fn sync_stats(&mut self, record_count: usize) {
        self.total_records = record_count as u64;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_roundtrip() {
        for (name, process) in [
            ("downloads", Process::Downloads),
            ("processing", Process::Processing),
            ("ingestion", Process::Ingestion),
            ("validation", Process::Validation),
        ] {
            assert_eq!(process.to_string(), name);
            assert_eq!(name.parse::<Process>().unwrap(), process);
        }
        assert!("dwonloadss".parse::<Process>().is_err());
    }

    #[test]
    fn test_version_pattern() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("12.34"));
        assert!(!is_valid_version("1"));
        assert!(!is_valid_version("1.0.0"));
        assert!(!is_valid_version("v1.0"));
        assert!(!is_valid_version("1."));
        assert!(!is_valid_version(".0"));
    }

    #[test]
    fn test_sync_stats() {
        let mut metadata = ManifestMetadata::new(Process::Downloads, "1.0".to_string());
        assert_eq!(metadata.total_records, 0);
        assert!(metadata.ts_updated.is_none());

        metadata.sync_stats(3);
        assert_eq!(metadata.total_records, 3);
        assert!(metadata.ts_updated.is_some());
    }
}
