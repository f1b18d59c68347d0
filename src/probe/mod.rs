//! Source probing: lightweight identity checks on a remote URL before
//! committing to a full download.
//!
//! A probe is two requests: a HEAD for headers, then a ranged GET for a
//! small sample of the payload. The sniffed MIME type from the sample is
//! authoritative; remote-side failures are encoded in the returned
//! [`ContentProbe`] rather than raised, so callers can branch without
//! error handling.

pub mod sniff;

use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use sniff::sniff_mime_type;

/// MIME sentinel for a probe whose HEAD failed with an HTTP error status.
pub const MIME_UNKNOWN: &str = "unknown";

/// MIME sentinel for a probe that failed at the transport level.
pub const MIME_ERROR: &str = "error";

/// Result of probing a source URL.
///
/// `probe_error` set implies `mime_type` is a sentinel value and the probe
/// must not be dispatched to a download strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentProbe {
    pub url: String,

    /// HTTP status of the HEAD request; 0 means the failure happened below
    /// HTTP (DNS, connect, timeout).
    pub status_code: u16,

    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,

    /// Resolved MIME type (sniffed from sample bytes, not headers)
    pub mime_type: String,

    pub is_range_supported: bool,

    pub checksums: ChecksumHeaders,

    pub probe_error: Option<String>,
}

impl ContentProbe {
    /// Whether the probe succeeded and may be handed to the download context.
    pub fn is_usable(&self) -> bool {
        self.probe_error.is_none()
    }

    fn transport_failure(url: &str, checksums: ChecksumHeaders, error: String) -> Self {
        Self {
            url: url.to_string(),
            status_code: 0,
            content_length: None,
            etag: None,
            last_modified: None,
            mime_type: MIME_ERROR.to_string(),
            is_range_supported: false,
            checksums,
            probe_error: Some(error),
        }
    }
}

/// Checksum-bearing headers collected during the probe.
///
/// All fields are optional; absence is not an error. Cloud-provider hash
/// headers are kept alongside the standard digest headers because bulk dumps
/// are frequently hosted on object storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksumHeaders {
    pub digest: Option<String>,
    pub content_digest: Option<String>,
    pub repr_digest: Option<String>,
    pub content_md5: Option<String>,
    pub etag: Option<String>,
    pub goog_hash: Option<String>,
    pub s3_sha256: Option<String>,
}

impl ChecksumHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            digest: get("digest"),
            content_digest: get("content-digest"),
            repr_digest: get("repr-digest"),
            content_md5: get("content-md5"),
            etag: get("etag"),
            goog_hash: get("x-goog-hash"),
            s3_sha256: get("x-amz-meta-sha256"),
        }
    }
}

/// Issues the HEAD + ranged-sample requests against a source URL.
pub struct SourceProber {
    client: reqwest::Client,
    sample_size: usize,
}

impl SourceProber {
    /// Build a prober with a bounded timeout and redirect following.
    ///
    /// The sample window is clamped to at least one byte; a zero-byte
    /// sample could never be sniffed and would produce a nonsense Range
    /// header.
    pub fn new(user_agent: &str, timeout: Duration, sample_size: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            sample_size: sample_size.max(1),
        })
    }

    /// Probe a URL and describe its content identity.
    ///
    /// Never returns an error for remote-side failures: HTTP error statuses
    /// and transport failures both come back as a populated `ContentProbe`
    /// with `probe_error` set.
    pub async fn probe(&self, url: &str) -> ContentProbe {
        // --- HEAD: headers only, fail fast on error status ---
        let head = match self.client.head(url).send().await {
            Ok(res) => res,
            Err(e) => {
                warn!(url, error = %e, "probe HEAD failed at transport level");
                return ContentProbe::transport_failure(
                    url,
                    ChecksumHeaders::default(),
                    format!("{}", e),
                );
            }
        };

        let status = head.status();
        let checksums = ChecksumHeaders::from_headers(head.headers());

        if status.is_client_error() || status.is_server_error() {
            // No sample fetch on a failed HEAD.
            return ContentProbe {
                url: url.to_string(),
                status_code: status.as_u16(),
                content_length: None,
                etag: checksums.etag.clone(),
                last_modified: None,
                mime_type: MIME_UNKNOWN.to_string(),
                is_range_supported: false,
                checksums,
                probe_error: Some(format!(
                    "HTTP error: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                )),
            };
        }

        let is_range_supported = head
            .headers()
            .get(header::ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);

        let content_length = head
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let last_modified = head
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // --- Sample: first N bytes, sniffed for the authoritative MIME type ---
        let mime_type = match self.fetch_sample(url).await {
            Ok(Some(sample)) => sniff_mime_type(&sample).to_string(),
            Ok(None) => MIME_UNKNOWN.to_string(),
            Err(e) => {
                warn!(url, error = %e, "probe sample fetch failed");
                return ContentProbe::transport_failure(url, checksums, format!("{}", e));
            }
        };

        debug!(url, status = status.as_u16(), mime_type, "probe complete");

        ContentProbe {
            url: url.to_string(),
            status_code: status.as_u16(),
            content_length,
            etag: checksums.etag.clone(),
            last_modified,
            mime_type,
            is_range_supported,
            checksums,
            probe_error: None,
        }
    }

    /// Fetch up to `sample_size` bytes via a Range request.
    ///
    /// Reads incrementally and stops at the sample window even when the
    /// server ignores Range and answers 200 with the full body.
    async fn fetch_sample(&self, url: &str) -> Result<Option<Vec<u8>>, reqwest::Error> {
        let mut response = self
            .client
            .get(url)
            .header(header::RANGE, format!("bytes=0-{}", self.sample_size - 1))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 && status != 206 {
            return Ok(None);
        }

        let mut sample = Vec::with_capacity(self.sample_size);
        while let Some(chunk) = response.chunk().await? {
            let remaining = self.sample_size - sample.len();
            sample.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if sample.len() >= self.sample_size {
                break;
            }
        }

        Ok(Some(sample))
    }
}
