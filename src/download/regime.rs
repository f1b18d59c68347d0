//! The download regime capability: one streaming-transfer implementation
//! per content family.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Transfer failure while streaming a download.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP transfer failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed writing to destination: {0}")]
    Write(#[from] std::io::Error),
}

/// A concrete streaming-transfer implementation.
///
/// Implementations must feed every received chunk into a running SHA-256
/// accumulator and write it to the destination before taking the next chunk,
/// so the returned digest always describes exactly the bytes persisted.
/// Memory use must stay bounded by one chunk regardless of payload size.
#[async_trait]
pub trait DownloadRegime: Send + Sync {
    /// Name recorded on the resulting download event.
    fn name(&self) -> &'static str;

    /// Stream `url` to `destination` and return the lowercase hex SHA-256
    /// digest of the bytes written.
    ///
    /// A transport error aborts the transfer; the truncated file is left in
    /// place for the caller to deal with.
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        client: &reqwest::Client,
    ) -> Result<String, TransferError>;
}
