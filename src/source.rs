//! Source catalog: the descriptions of remote data dumps the pipeline pulls.
//!
//! Sources are declared in a JSON catalog file and consumed read-only by the
//! prober and the download context.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One remote data dump: where it lives and what we expect it to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier, used in filenames and manifest records
    pub source_id: String,

    /// Dataset name within the source (e.g. "systems")
    pub dataset: String,

    /// Declared payload format before compression
    #[serde(default = "default_format")]
    pub expected_format: String,

    /// Declared compression of the dump
    #[serde(default = "default_compression")]
    pub compression: String,

    /// How to reach the source
    pub connection: Connection,
}

fn default_format() -> String {
    "json".to_string()
}

fn default_compression() -> String {
    "gzip".to_string()
}

impl Source {
    /// Multi-part extension extracted from the connection URL
    /// (e.g. ".json.gz"). Empty string when the URL path has none.
    pub fn full_extension(&self) -> String {
        let path = match reqwest::Url::parse(&self.connection.url) {
            Ok(url) => url.path().to_string(),
            Err(_) => return String::new(),
        };

        let filename = path.rsplit('/').next().unwrap_or("");

        // First dot onward, provided the tail is purely extension-like.
        match filename.find('.') {
            Some(idx) if idx > 0 && idx + 1 < filename.len() => {
                let ext = &filename[idx..];
                if ext
                    .chars()
                    .all(|c| c == '.' || c.is_ascii_alphanumeric())
                {
                    ext.to_string()
                } else {
                    String::new()
                }
            }
            _ => String::new(),
        }
    }
}

/// Connection settings for a source.
///
/// `retry_policy` is carried through from the catalog but not exercised by
/// the core pipeline; retries belong in the surrounding orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// Per-request timeout in seconds for the full transfer
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry_policy: Option<Value>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout() -> u64 {
    7200
}

impl Connection {
    /// Domain of the connection URL, for logs and diagnostics.
    pub fn domain(&self) -> String {
        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Validate and normalize a source URL before any network call.
///
/// Rejects non-http(s) schemes, missing hosts, and hostnames that can't be
/// real (leading/trailing hyphen, underscores).
pub fn sanitize_url(url: &str) -> Result<String> {
    let trimmed = url.trim();

    let parsed = reqwest::Url::parse(trimmed)
        .with_context(|| format!("Invalid URL format: {}", trimmed))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!(
            "Unsupported URL scheme '{}': only http/https are allowed",
            other
        ),
    }

    let host = parsed
        .host_str()
        .with_context(|| format!("URL is missing a host: {}", trimmed))?;

    if host.starts_with('-') || host.ends_with('-') {
        anyhow::bail!("Invalid hostname '{}': cannot start or end with a hyphen", host);
    }
    if host.contains('_') {
        anyhow::bail!("Invalid hostname '{}': cannot contain an underscore", host);
    }

    Ok(parsed.to_string())
}

/// All sources known to the pipeline, keyed by source_id.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: BTreeMap<String, Source>,
}

impl SourceCatalog {
    /// Load the catalog from a JSON file (a list of source objects).
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read source catalog: {}", path.display()))?;

        let entries: Vec<Source> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse source catalog: {}", path.display()))?;

        let mut sources = BTreeMap::new();
        for source in entries {
            sources.insert(source.source_id.clone(), source);
        }

        Ok(Self { sources })
    }

    pub fn get(&self, source_id: &str) -> Option<&Source> {
        self.sources.get(source_id)
    }

    pub fn list_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
