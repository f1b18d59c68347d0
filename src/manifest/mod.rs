//! Content-addressed manifests: the durable record of every artifact a
//! (process, version) pair has retrieved.
//!
//! - Metadata: the manifest header (process, version, counters, timestamps)
//! - Record: one entry per artifact, keyed by SHA-256 digest
//! - Store: load/commit with atomic renames

pub mod metadata;
pub mod record;
pub mod store;

pub use metadata::{is_valid_version, ManifestMetadata, Process};
pub use record::ManifestRecord;
pub use store::{Manifest, ManifestError, ManifestStore};
