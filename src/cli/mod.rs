//! Command-line interface for the ingestion pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::ResolvedConfig;
use crate::manifest::Process;
use crate::pipeline::{Pipeline, SourceOutcome};
use crate::probe::SourceProber;
use crate::source::{sanitize_url, SourceCatalog};

#[derive(Parser)]
#[command(name = "siphon", about = "Content-addressed ingestion of bulk HTTP data dumps", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe a URL and print the resolved content identity
    Probe {
        /// Source URL to probe
        url: String,
    },

    /// Download one source from the catalog and commit it to the manifest
    Fetch {
        /// Source ID from the catalog
        source_id: String,
    },

    /// Download every source in the catalog
    FetchAll,

    /// List the sources in the catalog
    Sources,

    /// Print a manifest as JSON
    Manifest {
        /// Pipeline process the manifest belongs to
        #[arg(long, default_value = "downloads")]
        process: Process,
    },

    /// Print the resolved configuration
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = ResolvedConfig::load()?;

        match self.command {
            Command::Probe { url } => probe(&config, &url).await,
            Command::Fetch { source_id } => fetch(&config, &source_id).await,
            Command::FetchAll => fetch_all(&config).await,
            Command::Sources => sources(&config).await,
            Command::Manifest { process } => manifest(&config, process).await,
            Command::Config => {
                println!("home:      {}", config.home.display());
                println!("downloads: {}", config.downloads_dir.display());
                println!("manifests: {}", config.manifests_dir.display());
                println!("sources:   {}", config.sources_path.display());
                println!("version:   {}", config.version);
                if let Some(file) = &config.config_file {
                    println!("config:    {}", file.display());
                }
                Ok(())
            }
        }
    }
}

async fn probe(config: &ResolvedConfig, url: &str) -> Result<()> {
    let url = sanitize_url(url)?;

    let prober = SourceProber::new(
        &config.network.user_agent,
        std::time::Duration::from_secs(config.network.probe_timeout_secs),
        config.network.sample_size,
    )?;

    let result = prober.probe(&url).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

async fn fetch(config: &ResolvedConfig, source_id: &str) -> Result<()> {
    config.ensure_directories().await?;

    let catalog = SourceCatalog::load(&config.sources_path).await?;
    let source = catalog
        .get(source_id)
        .with_context(|| format!("Unknown source: {}", source_id))?;

    let pipeline = Pipeline::new(config)?;
    let mut manifest = pipeline.store().load(Process::Downloads).await?;

    match pipeline.run_source(&mut manifest, source).await? {
        SourceOutcome::Completed(record) => {
            info!(
                sha256 = %record.sha256,
                bytes = record.file_size_bytes,
                path = %record.file_path.display(),
                "fetch complete"
            );
            println!("{}", record.sha256);
        }
        SourceOutcome::Skipped { reason } => {
            anyhow::bail!("Probe failed for '{}': {}", source_id, reason);
        }
    }

    Ok(())
}

async fn fetch_all(config: &ResolvedConfig) -> Result<()> {
    config.ensure_directories().await?;

    let catalog = SourceCatalog::load(&config.sources_path).await?;
    if catalog.is_empty() {
        anyhow::bail!("Source catalog is empty: {}", config.sources_path.display());
    }

    let pipeline = Pipeline::new(config)?;
    let summary = pipeline.run_all(&catalog).await?;

    println!(
        "completed: {}  skipped: {}  failed: {}",
        summary.completed, summary.skipped, summary.failed
    );

    Ok(())
}

async fn sources(config: &ResolvedConfig) -> Result<()> {
    let catalog = SourceCatalog::load(&config.sources_path).await?;

    for source in catalog.iter() {
        println!(
            "{:<16} {:<12} {}",
            source.source_id,
            source.dataset,
            source.connection.url
        );
    }

    Ok(())
}

async fn manifest(config: &ResolvedConfig, process: Process) -> Result<()> {
    let store = crate::manifest::ManifestStore::new(
        config.manifests_dir.clone(),
        config.version.clone(),
    )?;

    let manifest = store.load(process).await?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);

    Ok(())
}
