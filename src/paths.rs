//! Deterministic path resolution for downloads and manifests.
//!
//! Every function here is pure: callers get back a path (or filename) and
//! decide separately whether to create directories. That keeps the resolvers
//! safe to call for dry-run and diagnostic output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};

use crate::manifest::Process;

/// Replace dots in a version string so filenames never contain
/// path-like dot sequences ("1.0" -> "1-0").
pub fn sanitize_version(version: &str) -> String {
    version.replace('.', "-")
}

/// Date-partitioned download directory: `<root>/<year>/<month>`.
pub fn download_dir(downloads_root: &Path, timestamp: DateTime<Utc>) -> PathBuf {
    downloads_root
        .join(timestamp.year().to_string())
        .join(format!("{:02}", timestamp.month()))
}

/// Manifest path for a (process, version) pair:
/// `<manifests_root>/<process>_v<sanitized-version>.json`.
pub fn manifest_path(manifests_root: &Path, process: Process, version: &str) -> PathBuf {
    manifests_root.join(format!("{}_v{}.json", process, sanitize_version(version)))
}

/// Standardized filename for a downloaded artifact.
///
/// Format: `<source_id>_<dataset>_<process>_<YYYYMMDD-HHMMSS>_v<version><ext>`
pub fn download_filename(
    source_id: &str,
    dataset: &str,
    process: Process,
    timestamp: DateTime<Utc>,
    version: &str,
    extension: &str,
) -> String {
    format!(
        "{}_{}_{}_{}_v{}{}",
        source_id,
        dataset,
        process,
        timestamp.format("%Y%m%d-%H%M%S"),
        sanitize_version(version),
        extension,
    )
}

/// Full destination path for a download: partitioned directory + filename.
pub fn download_path(
    downloads_root: &Path,
    source_id: &str,
    dataset: &str,
    process: Process,
    timestamp: DateTime<Utc>,
    version: &str,
    extension: &str,
) -> PathBuf {
    download_dir(downloads_root, timestamp).join(download_filename(
        source_id, dataset, process, timestamp, version, extension,
    ))
}
