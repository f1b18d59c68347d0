//! siphon - content-addressed ingestion pipeline for bulk HTTP data dumps
//!
//! Pulls large remote data dumps (gzip/JSON) over HTTP, verifies their
//! identity and integrity, and records every retrieved artifact in a
//! durable, content-addressed manifest.
//!
//! # Pipeline
//!
//! One source at a time:
//! 1. Probe the URL (HEAD + ranged sample) to resolve its content identity
//! 2. Dispatch to the download regime registered for the sniffed MIME type
//! 3. Stream the payload to disk while computing a running SHA-256
//! 4. Commit the verified record to the manifest with an atomic rename
//!
//! # Modules
//!
//! - `probe`: HEAD + sample probing and magic-byte MIME sniffing
//! - `download`: strategy registry, streaming regimes, download events
//! - `manifest`: content-addressed manifest store
//! - `paths`: pure path resolution for downloads and manifests
//! - `source`: source catalog (what to pull, from where)
//! - `pipeline`: the probe -> dispatch -> stream -> commit control flow
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Inspect a remote dump without downloading it
//! siphon probe https://downloads.example.com/galaxy.json.gz
//!
//! # Pull one source and commit it to the manifest
//! siphon fetch spansh-systems
//!
//! # Pull everything in the catalog
//! siphon fetch-all
//! ```

pub mod cli;
pub mod config;
pub mod download;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod probe;
pub mod source;

// Re-export main types at crate root for convenience
pub use download::{DownloadContext, DownloadError, DownloadRecord, DownloadRegime, GzipRegime};
pub use manifest::{Manifest, ManifestError, ManifestRecord, ManifestStore, Process};
pub use pipeline::{Pipeline, PipelineError, RunSummary, SourceOutcome};
pub use probe::{ContentProbe, SourceProber};
pub use source::{Source, SourceCatalog};
