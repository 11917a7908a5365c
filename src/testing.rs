//! In-memory collaborators shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::RequestHandler;
use crate::download::{Download, DownloadStatus};
use crate::error::{Error, Result};
use crate::stats::FileStats;

/// Serves canned JSON bodies keyed by URI and records every request.
#[derive(Default)]
pub struct MockRequestHandler {
    responses: HashMap<String, serde_json::Value>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockRequestHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: &str, body: serde_json::Value) -> Self {
        self.responses.insert(uri.to_string(), body);
        self
    }

    pub fn failing(mut self, uri: &str) -> Self {
        self.failing.insert(uri.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestHandler for MockRequestHandler {
    async fn get(&self, uri: &str) -> Result<serde_json::Value> {
        self.calls.lock().unwrap().push(uri.to_string());
        if self.failing.contains(uri) {
            return Err(Error::Status {
                uri: uri.to_string(),
                status: 500,
            });
        }
        self.responses.get(uri).cloned().ok_or_else(|| Error::Status {
            uri: uri.to_string(),
            status: 404,
        })
    }
}

/// Records download calls; destinations listed in `failing` return an error.
#[derive(Default)]
pub struct MockDownload {
    failing: HashSet<PathBuf>,
    calls: Mutex<Vec<(PathBuf, String, u64)>>,
}

impl MockDownload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, dest: impl Into<PathBuf>) -> Self {
        self.failing.insert(dest.into());
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, String, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Download for MockDownload {
    async fn download(&self, dest: &Path, url: &str, expected_size: u64) -> Result<DownloadStatus> {
        self.calls
            .lock()
            .unwrap()
            .push((dest.to_path_buf(), url.to_string(), expected_size));
        if self.failing.contains(dest) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        Ok(DownloadStatus::Downloaded(FileStats {
            size: expected_size,
            ..FileStats::default()
        }))
    }
}
