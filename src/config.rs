//! Configuration for siphon paths and network behavior.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SIPHON_HOME)
//! 2. Config file (.siphon/config.yaml)
//! 3. Defaults (~/.siphon)
//!
//! Config file discovery walks the current directory and its parents. The
//! resolved config is loaded explicitly at startup and passed by reference;
//! there is no global cached instance.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::manifest::is_valid_version;

/// Raw config file schema (matches the YAML structure).
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub network: Option<NetworkConfig>,
    #[serde(default)]
    pub downloads: Option<DownloadsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Pipeline state root (relative to the config file's project root)
    pub home: Option<String>,
    pub downloads: Option<String>,
    pub manifests: Option<String>,
    /// Source catalog file
    pub sources: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub user_agent: Option<String>,
    pub probe_timeout_secs: Option<u64>,
    pub sample_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    pub chunk_size: Option<usize>,
}

/// Network settings with defaults applied.
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub user_agent: String,
    pub probe_timeout_secs: u64,
    pub sample_size: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            probe_timeout_secs: 5,
            sample_size: 1024,
        }
    }
}

/// Download settings with defaults applied.
///
/// `chunk_size` is carried from the config surface for downstream stages;
/// the streaming regimes hash and write at network-chunk granularity.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub chunk_size: usize,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            chunk_size: 128 * 1024,
        }
    }
}

fn default_user_agent() -> String {
    format!("siphon/{}", env!("CARGO_PKG_VERSION"))
}

/// Resolved configuration with absolute paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the siphon home (pipeline state root)
    pub home: PathBuf,
    pub downloads_dir: PathBuf,
    pub manifests_dir: PathBuf,
    /// Source catalog file
    pub sources_path: PathBuf,
    /// Pipeline version stamped into filenames and manifests
    pub version: String,
    pub network: NetworkSettings,
    pub downloads: DownloadSettings,
    /// Path to the config file, if one was found
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".siphon");

        let config_file = find_config_file();

        let (mut home, file) = if let Some(ref config_path) = config_file {
            let file = load_config_file(config_path)?;

            // Base directory is the parent of .siphon/
            let base_dir = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."))
                .to_path_buf();

            let home = file
                .paths
                .home
                .as_deref()
                .map(|p| resolve_path(&base_dir, p))
                .unwrap_or(default_home);

            (home, Some((file, base_dir)))
        } else {
            (default_home, None)
        };

        if let Ok(env_home) = std::env::var("SIPHON_HOME") {
            home = PathBuf::from(env_home);
        }

        let (paths, network_cfg, downloads_cfg, version) = match file {
            Some((file, base_dir)) => {
                let resolve = |p: &Option<String>| {
                    p.as_deref().map(|p| resolve_path(&base_dir, p))
                };
                (
                    (
                        resolve(&file.paths.downloads),
                        resolve(&file.paths.manifests),
                        resolve(&file.paths.sources),
                    ),
                    file.network,
                    file.downloads,
                    file.version,
                )
            }
            None => ((None, None, None), None, None, None),
        };

        let version = version.unwrap_or_else(|| "1.0".to_string());
        if !is_valid_version(&version) {
            anyhow::bail!("Invalid pipeline version '{}': expected major.minor", version);
        }

        let defaults = NetworkSettings::default();
        let network = NetworkSettings {
            user_agent: network_cfg
                .as_ref()
                .and_then(|n| n.user_agent.clone())
                .unwrap_or(defaults.user_agent),
            probe_timeout_secs: network_cfg
                .as_ref()
                .and_then(|n| n.probe_timeout_secs)
                .unwrap_or(defaults.probe_timeout_secs),
            sample_size: network_cfg
                .as_ref()
                .and_then(|n| n.sample_size)
                .unwrap_or(defaults.sample_size),
        };

        let downloads = DownloadSettings {
            chunk_size: downloads_cfg
                .as_ref()
                .and_then(|d| d.chunk_size)
                .unwrap_or_else(|| DownloadSettings::default().chunk_size),
        };

        Ok(Self {
            downloads_dir: paths.0.unwrap_or_else(|| home.join("downloads")),
            manifests_dir: paths.1.unwrap_or_else(|| home.join("manifests")),
            sources_path: paths.2.unwrap_or_else(|| home.join("sources.json")),
            home,
            version,
            network,
            downloads,
            config_file,
        })
    }

    /// Create the download and manifest roots.
    ///
    /// This is the one explicit directory-creation step; path resolution
    /// itself never touches the filesystem.
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.downloads_dir, &self.manifests_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Find the config file by searching the current directory and its parents.
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".siphon").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root.
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
