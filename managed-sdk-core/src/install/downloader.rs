//! Streaming archive download with progress reporting.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use super::error::DownloadError;
use crate::progress::Progress;

/// Fetches a remote archive to a local file.
#[async_trait]
pub trait ArchiveDownloader: Send + Sync {
    /// Downloads `source` to `destination`, reporting through `progress`.
    ///
    /// Implementations call `start` and `done` on `progress` themselves.
    async fn download(
        &self,
        source: &str,
        destination: &Path,
        progress: Progress,
    ) -> Result<(), DownloadError>;
}

// ============================================================================
// URL Validation
// ============================================================================

/// Parses `source` and checks it is an http(s) URL with a host.
fn validate_url(source: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(source).map_err(|source_error| DownloadError::InvalidUrl {
        url: source.to_string(),
        source: source_error,
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(DownloadError::UnsupportedScheme(source.to_string()));
    }

    Ok(url)
}

// ============================================================================
// HTTP Downloader
// ============================================================================

/// [`ArchiveDownloader`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// Creates a downloader that identifies itself with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveDownloader for HttpDownloader {
    async fn download(
        &self,
        source: &str,
        destination: &Path,
        mut progress: Progress,
    ) -> Result<(), DownloadError> {
        info!("Downloading {} to {}", source, destination.display());
        let url = validate_url(source)?;

        let io_error = |source| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // Nothing from an earlier attempt may survive a failed one.
            if let Err(e) = tokio::fs::remove_file(destination).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", destination.display(), e);
                }
            }
            return Err(DownloadError::Status {
                url: source.to_string(),
                status,
            });
        }

        let total_bytes = response.content_length();
        debug!("Content-Length: {:?}", total_bytes);
        progress.start(
            &format!("Downloading {}", source),
            total_bytes.filter(|len| *len > 0).unwrap_or(1),
        );

        let mut file = File::create(destination).await.map_err(io_error)?;
        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_error)?;
            bytes_downloaded += chunk.len() as u64;
            progress.update(chunk.len() as u64);
        }

        file.flush().await.map_err(io_error)?;
        progress.done();

        info!(
            "Download complete: {} bytes written to {}",
            bytes_downloaded,
            destination.display()
        );
        Ok(())
    }
}
