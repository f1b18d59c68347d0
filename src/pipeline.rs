//! The single-source ingestion pipeline: probe, dispatch, stream, commit.
//!
//! Sources are processed one at a time. A probe failure skips that source
//! and the batch continues; structural failures (no strategy, integrity,
//! filesystem) stop that source; manifest corruption stops the whole run.

use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ResolvedConfig;
use crate::download::{DownloadContext, DownloadError, DownloadRecord};
use crate::manifest::{Manifest, ManifestError, ManifestStore, Process};
use crate::probe::SourceProber;
use crate::source::{sanitize_url, Source, SourceCatalog};

/// Structural failure while processing one source.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid source URL: {0}")]
    InvalidUrl(#[source] anyhow::Error),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// What happened to one source.
#[derive(Debug)]
pub enum SourceOutcome {
    /// Downloaded, verified, and committed to the manifest
    Completed(DownloadRecord),

    /// Probe failed; captured in-band so the batch can continue
    Skipped { reason: String },
}

/// Tally for a batch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Wires the prober, strategy context, and manifest store together.
pub struct Pipeline {
    prober: SourceProber,
    context: DownloadContext,
    store: ManifestStore,
}

impl Pipeline {
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let prober = SourceProber::new(
            &config.network.user_agent,
            Duration::from_secs(config.network.probe_timeout_secs),
            config.network.sample_size,
        )?;

        let context = DownloadContext::new(
            config.downloads_dir.clone(),
            config.version.clone(),
            &config.network.user_agent,
        )?;

        let store = ManifestStore::new(config.manifests_dir.clone(), config.version.clone())
            .context("Failed to open manifest store")?;

        Ok(Self {
            prober,
            context,
            store,
        })
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Run one source end to end against an already-loaded manifest.
    pub async fn run_source(
        &self,
        manifest: &mut Manifest,
        source: &Source,
    ) -> Result<SourceOutcome, PipelineError> {
        let url = sanitize_url(&source.connection.url).map_err(PipelineError::InvalidUrl)?;

        let probe = self.prober.probe(&url).await;
        if let Some(reason) = &probe.probe_error {
            warn!(
                source_id = %source.source_id,
                status = probe.status_code,
                reason = %reason,
                "probe failed, skipping source"
            );
            return Ok(SourceOutcome::Skipped {
                reason: reason.clone(),
            });
        }

        let record = self.context.execute(&probe, source).await?;

        self.store
            .add_record(manifest, source, &record, probe.etag.clone())
            .await?;

        Ok(SourceOutcome::Completed(record))
    }

    /// Run every source in the catalog sequentially.
    ///
    /// Manifest corruption aborts the run; any other per-source failure is
    /// logged and the batch moves on.
    pub async fn run_all(&self, catalog: &SourceCatalog) -> Result<RunSummary> {
        let mut manifest = self.store.load(Process::Downloads).await?;
        let mut summary = RunSummary::default();

        for source in catalog.iter() {
            match self.run_source(&mut manifest, source).await {
                Ok(SourceOutcome::Completed(record)) => {
                    info!(
                        source_id = %source.source_id,
                        sha256 = %record.sha256,
                        "source completed"
                    );
                    summary.completed += 1;
                }
                Ok(SourceOutcome::Skipped { reason }) => {
                    info!(source_id = %source.source_id, reason = %reason, "source skipped");
                    summary.skipped += 1;
                }
                Err(PipelineError::Manifest(e)) => {
                    // An untrustworthy manifest must stop the whole run.
                    return Err(e.into());
                }
                Err(e) => {
                    error!(source_id = %source.source_id, error = %e, "source failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
