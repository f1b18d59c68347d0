//! Download strategy dispatch: map a probed content identity to a concrete
//! streaming regime and execute it.
//!
//! The registry is a closed map from MIME type to regime. There is no
//! fallback regime: guessing a decoder for unknown binary content would
//! undermine the integrity guarantee, so an unmapped type is a hard error.

pub mod event;
pub mod gzip;
pub mod regime;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::manifest::Process;
use crate::paths;
use crate::probe::ContentProbe;
use crate::source::Source;

pub use event::{DownloadRecord, RecordError};
pub use gzip::GzipRegime;
pub use regime::{DownloadRegime, TransferError};

/// Failure while dispatching or executing a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no download strategy registered for MIME type '{mime_type}'")]
    NoStrategy { mime_type: String },

    #[error("probe for {url} is unusable: {reason}")]
    UnusableProbe { url: String, reason: String },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("download could not be verified: {0}")]
    Record(#[from] RecordError),

    #[error("failed to prepare destination directory: {0}")]
    Destination(#[from] std::io::Error),
}

/// Executes downloads by picking the regime registered for the probed
/// MIME type.
///
/// Holds no per-download state; one context is reused across sequential
/// downloads.
pub struct DownloadContext {
    downloads_root: PathBuf,
    version: String,
    process: Process,
    client: reqwest::Client,
    registry: HashMap<String, Arc<dyn DownloadRegime>>,
}

impl DownloadContext {
    /// Build a context with the default registry (gzip only).
    ///
    /// The transfer client carries no overall timeout: bulk dumps can take
    /// hours, and aborts are driven by closing the connection.
    pub fn new(
        downloads_root: PathBuf,
        version: String,
        user_agent: &str,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;

        let mut registry: HashMap<String, Arc<dyn DownloadRegime>> = HashMap::new();
        registry.insert("application/gzip".to_string(), Arc::new(GzipRegime));

        Ok(Self {
            downloads_root,
            version,
            process: Process::Downloads,
            client,
            registry,
        })
    }

    /// Register a regime for a MIME type. Adding a content family means
    /// adding an entry here, not touching the dispatcher.
    pub fn register(&mut self, mime_type: impl Into<String>, regime: Arc<dyn DownloadRegime>) {
        self.registry.insert(mime_type.into(), regime);
    }

    /// MIME types the context can currently dispatch.
    pub fn registered_types(&self) -> Vec<&str> {
        self.registry.keys().map(String::as_str).collect()
    }

    /// Execute the download a probe describes and return a verifiable record.
    pub async fn execute(
        &self,
        probe: &ContentProbe,
        source: &Source,
    ) -> Result<DownloadRecord, DownloadError> {
        if let Some(reason) = &probe.probe_error {
            return Err(DownloadError::UnusableProbe {
                url: probe.url.clone(),
                reason: reason.clone(),
            });
        }

        // Exact-match lookup; unmapped types are a hard error.
        let regime = self
            .registry
            .get(&probe.mime_type)
            .ok_or_else(|| DownloadError::NoStrategy {
                mime_type: probe.mime_type.clone(),
            })?;

        let started = Utc::now();

        let mut extension = source.full_extension();
        if extension.is_empty() {
            extension = extension_for_mime(&probe.mime_type).to_string();
        }

        let destination = paths::download_path(
            &self.downloads_root,
            &source.source_id,
            &source.dataset,
            self.process,
            started,
            &self.version,
            &extension,
        );

        // Directory creation happens here, explicitly, before any bytes flow.
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(
            source_id = %source.source_id,
            url = %probe.url,
            regime = regime.name(),
            destination = %destination.display(),
            "starting download"
        );

        let sha256 = regime.download(&probe.url, &destination, &self.client).await?;
        let completed = Utc::now();

        // Constructor failure means the file on disk is untrusted; it never
        // reaches the manifest.
        let record = DownloadRecord::new(
            &destination,
            sha256,
            started,
            completed,
            regime.name().to_string(),
        )?;

        info!(
            source_id = %source.source_id,
            sha256 = %record.sha256,
            bytes = record.file_size_bytes,
            "download verified"
        );

        Ok(record)
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "application/gzip" => ".gz",
        "application/json" => ".json",
        _ => ".bin",
    }
}
