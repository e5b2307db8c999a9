//! Streams a release asset into a uniquely named scratch file.
//!
//! Each download gets a fresh UUID file name and is opened with
//! create-new semantics, so parallel jobs sharing a scratch volume never
//! write into each other's files. A collision is reported, never resolved.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::{Response, StatusCode};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::http::{ASSET_MEDIA_TYPE, GitHubClient};
use crate::retry::Transient;

const LOG_TARGET: &str = "gitops_setup::download";

/// Failures while transferring an asset.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request or body stream did not complete.
    #[error("failed to download {url}")]
    Transport {
        /// Requested URL.
        url: Url,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The asset host answered with a non-success status.
    #[error("download of {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: Url,
        /// Status returned.
        status: StatusCode,
    },
    /// The body length disagreed with the advertised length.
    #[error("download of {url} was incomplete: expected {expected} bytes, received {received}")]
    Truncated {
        /// Requested URL.
        url: Url,
        /// Advertised `Content-Length`.
        expected: u64,
        /// Bytes actually written.
        received: u64,
    },
    /// The temporary path already existed.
    #[error("temporary download path {path} already exists")]
    Collision {
        /// Path that was taken.
        path: Utf8PathBuf,
        /// Underlying open error.
        #[source]
        source: io::Error,
    },
    /// Writing the temporary file failed.
    #[error("failed to write temporary download {path}")]
    Io {
        /// Temporary file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl Transient for DownloadError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Truncated { .. } => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Collision { .. } | Self::Io { .. } => false,
        }
    }
}

/// Downloads assets into a scratch directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    scratch_dir: Utf8PathBuf,
}

impl Downloader {
    /// Writes downloads beneath `scratch_dir`, which must already exist.
    #[must_use]
    pub const fn new(scratch_dir: Utf8PathBuf) -> Self {
        Self { scratch_dir }
    }

    /// Directory receiving temporary files.
    #[must_use]
    pub fn scratch_dir(&self) -> &Utf8Path {
        &self.scratch_dir
    }

    /// Streams `url` into a new temporary file and returns its path.
    ///
    /// The file is flushed and synced before this returns. On failure any
    /// partially written file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Collision`] if the generated path exists,
    /// and transport, status, truncation, or I/O errors otherwise.
    pub async fn download(
        &self,
        client: &GitHubClient,
        url: &Url,
    ) -> Result<Utf8PathBuf, DownloadError> {
        let destination = self.scratch_dir.join(Uuid::new_v4().to_string());
        info!(target: LOG_TARGET, %url, path = %destination, "downloading asset");

        let mut response = client
            .get(url.clone(), ASSET_MEDIA_TYPE)
            .send()
            .await
            .map_err(|source| DownloadError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.clone(),
                status,
            });
        }

        let mut file = open_exclusive(&destination).await?;
        match stream_body(&mut response, &mut file, url, &destination).await {
            Ok(written) => {
                debug!(target: LOG_TARGET, path = %destination, bytes = written, "download complete");
                Ok(destination)
            }
            Err(err) => {
                drop(file);
                discard_partial(&destination).await;
                Err(err)
            }
        }
    }
}

/// Opens `path` for writing, failing if anything already exists there.
pub(crate) async fn open_exclusive(path: &Utf8Path) -> Result<File, DownloadError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                DownloadError::Collision {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                DownloadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
}

async fn stream_body(
    response: &mut Response,
    file: &mut File,
    url: &Url,
    path: &Utf8Path,
) -> Result<u64, DownloadError> {
    let advertised = response.content_length();
    let io_error = |source: io::Error| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| DownloadError::Transport {
            url: url.clone(),
            source,
        })?
    {
        file.write_all(&chunk).await.map_err(io_error)?;
        written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
    }

    file.flush().await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)?;

    match advertised {
        Some(expected) if expected != written => Err(DownloadError::Truncated {
            url: url.clone(),
            expected,
            received: written,
        }),
        _ => Ok(written),
    }
}

async fn discard_partial(path: &Utf8Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            target: LOG_TARGET,
            path = %path,
            error = %err,
            "failed to remove partial download"
        ),
    }
}
