//! Document downloader
//!
//! Streams a document body to disk in fixed-size chunks under the name the
//! resolver derives from the response. Bytes go to a hidden `.part` file
//! first and are renamed into place only once the whole body has been
//! written, so a failed transfer never leaves a truncated document behind.

use crate::config::Config;
use crate::crawler::resolver::{resolve_filename, ResponseHints};
use crate::crawler::session::{RequestOptions, Session};
use crate::model::{DownloadResult, FailureKind};
use reqwest::Response;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Write buffer size for streamed bodies
pub const CHUNK_BUFFER_SIZE: usize = 8192;

/// Saves documents into one flat destination directory
#[derive(Debug, Clone)]
pub struct Downloader {
    destination: PathBuf,
    options: RequestOptions,
}

impl Downloader {
    pub fn new(destination: impl Into<PathBuf>, options: RequestOptions) -> Self {
        Self {
            destination: destination.into(),
            options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.output.download_dir,
            RequestOptions::download(&config.http),
        )
    }

    /// Directory documents are written into
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Downloads one document
    ///
    /// # Returns
    ///
    /// * `DownloadResult::Saved` - a new file was written
    /// * `DownloadResult::Skipped` - a file with the resolved name already existed;
    ///   the body is not transferred
    /// * `DownloadResult::Failed` - network or filesystem failure; no file is left
    ///
    /// Never returns an error: every failure becomes a `Failed` result.
    pub async fn download(&self, session: &Session, url: &str) -> DownloadResult {
        if let Err(e) = fs::create_dir_all(&self.destination).await {
            return failed(url, FailureKind::Filesystem, e);
        }

        let response = match session.get(url, self.options).await {
            Ok(response) => response,
            Err(e) => return failed(url, FailureKind::Network, e),
        };

        let hints = ResponseHints::from_response(&response);
        let filename = resolve_filename(&hints);
        let path = self.destination.join(&filename);

        match fs::try_exists(&path).await {
            Ok(true) => {
                tracing::info!("Skipping {}, already exists at {}", url, path.display());
                return DownloadResult::Skipped {
                    url: url.to_string(),
                    path,
                };
            }
            Ok(false) => {}
            Err(e) => return failed(url, FailureKind::Filesystem, e),
        }

        let part_path = self.destination.join(format!(".{}.part", filename));

        match stream_to_file(response, &part_path, self.options.timeout).await {
            Ok(bytes) => {
                if let Err(e) = fs::rename(&part_path, &path).await {
                    discard(&part_path).await;
                    return failed(url, FailureKind::Filesystem, e);
                }

                tracing::info!("Saved {} ({} bytes) to {}", url, bytes, path.display());
                DownloadResult::Saved {
                    url: url.to_string(),
                    path,
                    bytes,
                }
            }
            Err((kind, cause)) => {
                discard(&part_path).await;
                failed(url, kind, cause)
            }
        }
    }
}

/// Copies the response body into `path` chunk by chunk
///
/// Fails only when no chunk arrives within `idle`; the total transfer time
/// is unbounded.
async fn stream_to_file(
    mut response: Response,
    path: &Path,
    idle: Duration,
) -> Result<u64, (FailureKind, String)> {
    let file = File::create(path)
        .await
        .map_err(|e| (FailureKind::Filesystem, e.to_string()))?;
    let mut writer = BufWriter::with_capacity(CHUNK_BUFFER_SIZE, file);
    let mut written = 0u64;

    loop {
        let chunk = tokio::time::timeout(idle, response.chunk())
            .await
            .map_err(|_| {
                (
                    FailureKind::Network,
                    format!("no data received for {}s", idle.as_secs_f64()),
                )
            })?
            .map_err(|e| (FailureKind::Network, e.to_string()))?;

        let Some(chunk) = chunk else {
            break;
        };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| (FailureKind::Filesystem, e.to_string()))?;
        written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| (FailureKind::Filesystem, e.to_string()))?;

    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}

fn failed(url: &str, kind: FailureKind, cause: impl ToString) -> DownloadResult {
    let cause = cause.to_string();
    tracing::warn!("Download of {} failed ({}): {}", url, kind, cause);
    DownloadResult::Failed {
        url: url.to_string(),
        kind,
        cause,
    }
}
