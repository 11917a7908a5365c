//! Fetching a resolved rendition to local storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::stats::{DownloadStatsTracker, FileStats};

/// What a download call did.
#[derive(Debug, Clone)]
pub enum DownloadStatus {
    /// Bytes were fetched and stored.
    Downloaded(FileStats),
    /// A file with the expected size was already at the destination.
    AlreadyPresent,
}

/// Stores the bytes behind a URL at a local path.
///
/// Calling it twice with the same destination and URL must be safe; the
/// dispatcher keeps no record of earlier runs.
#[async_trait]
pub trait Download: Send + Sync {
    /// Downloads `url` to `dest`, expecting `expected_size` bytes.
    async fn download(&self, dest: &Path, url: &str, expected_size: u64) -> Result<DownloadStatus>;
}

/// Returns the `.part` file path for a given final path.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// [`Download`] over HTTP with atomic `.part` file semantics.
pub struct HttpDownload<F: FileSystem = TokioFileSystem> {
    client: reqwest::Client,
    config: DownloadConfig,
    fs: F,
}

impl HttpDownload<TokioFileSystem> {
    /// Creates a downloader writing through `tokio::fs`.
    #[must_use]
    pub const fn new(client: reqwest::Client, config: DownloadConfig) -> Self {
        Self {
            client,
            config,
            fs: TokioFileSystem,
        }
    }
}

impl<F: FileSystem> HttpDownload<F> {
    /// Creates a downloader with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(client: reqwest::Client, config: DownloadConfig, fs: F) -> Self {
        Self { client, config, fs }
    }

    /// Returns true when `dest` already holds a complete copy.
    ///
    /// A size of zero means the API did not report one, so nothing is
    /// considered complete.
    async fn is_complete(&self, dest: &Path, expected_size: u64) -> bool {
        !self.config.force_overwrite
            && expected_size > 0
            && self.fs.file_size(dest).await == Some(expected_size)
    }

    /// Ensures the parent directory exists for a file path.
    async fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Streams the response body for `url` into `part`.
    async fn fetch_to(&self, part: &Path, url: &str, expected_size: u64) -> Result<FileStats> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                uri: url.to_string(),
                status: status.as_u16(),
            });
        }

        let tracker = DownloadStatsTracker::new();
        let mut file = self.fs.create_file(part).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            tracker.record_bytes(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        let written = tracker.downloaded();
        if expected_size > 0 && written != expected_size {
            return Err(Error::SizeMismatch {
                path: part.display().to_string(),
                expected: expected_size,
                actual: written,
            });
        }
        Ok(tracker.into_file_stats())
    }

    /// Fetches into `part`, then moves it over `dest`.
    async fn fetch_and_store(
        &self,
        part: &Path,
        dest: &Path,
        url: &str,
        expected_size: u64,
    ) -> Result<FileStats> {
        let stats = self.fetch_to(part, url, expected_size).await?;
        self.fs.rename_file(part, dest).await?;
        Ok(stats)
    }
}

#[async_trait]
impl<F: FileSystem> Download for HttpDownload<F> {
    async fn download(&self, dest: &Path, url: &str, expected_size: u64) -> Result<DownloadStatus> {
        if self.is_complete(dest, expected_size).await {
            log::debug!("{} already present, skipping", dest.display());
            return Ok(DownloadStatus::AlreadyPresent);
        }

        self.ensure_parent_dir(dest).await?;
        let part = part_path(dest);
        log::debug!("Downloading {url} to {}", dest.display());

        match self.fetch_and_store(&part, dest, url, expected_size).await {
            Ok(stats) => Ok(DownloadStatus::Downloaded(stats)),
            Err(e) => {
                if self.config.cleanup_on_error {
                    let _ = self.fs.remove_file(&part).await;
                }
                Err(e)
            }
        }
    }
}
