//! Streaming regime for gzip-compressed dumps.

use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::regime::{DownloadRegime, TransferError};

/// Streams a gzip payload to disk verbatim (no decompression), hashing as
/// it goes. The bytes on disk are exactly the bytes the server sent.
pub struct GzipRegime;

#[async_trait]
impl DownloadRegime for GzipRegime {
    fn name(&self) -> &'static str {
        "gzip"
    }

    async fn download(
        &self,
        url: &str,
        destination: &Path,
        client: &reqwest::Client,
    ) -> Result<String, TransferError> {
        let mut response = client.get(url).send().await?.error_for_status()?;

        let mut file = File::create(destination).await?;
        let mut hasher = Sha256::new();
        let mut bytes_written: u64 = 0;

        // Hash then write the same chunk before advancing, so the digest
        // never gets ahead of what is on disk.
        while let Some(chunk) = response.chunk().await? {
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }

        file.flush().await?;

        debug!(
            url,
            bytes = bytes_written,
            destination = %destination.display(),
            "gzip transfer complete"
        );

        Ok(hex::encode(hasher.finalize()))
    }
}
