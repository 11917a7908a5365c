//! Download and run statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::dispatch::DispatchReport;

/// Statistics for a single file download.
#[derive(Debug, Clone, Default)]
pub struct FileStats {
    /// Bytes written to disk.
    pub size: u64,
    /// Time taken to download the file.
    pub elapsed: Duration,
    /// Average download speed in bytes per second.
    pub average_speed: u64,
}

/// Tracks bytes received while a file downloads.
pub struct DownloadStatsTracker {
    start_time: Instant,
    downloaded: AtomicU64,
}

impl Default for DownloadStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadStatsTracker {
    /// Starts tracking a new download.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            downloaded: AtomicU64::new(0),
        }
    }

    /// Records received bytes and returns the running total.
    pub fn record_bytes(&self, bytes: u64) -> u64 {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    /// Returns the bytes recorded so far.
    #[must_use]
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// Returns the elapsed time since the download started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Converts this tracker into final file statistics.
    #[must_use]
    pub fn into_file_stats(self) -> FileStats {
        let elapsed = self.elapsed();
        let size = self.downloaded();
        FileStats {
            size,
            elapsed,
            average_speed: bytes_per_sec(size, elapsed),
        }
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn bytes_per_sec(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    }
}

/// Totals for a whole backup run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Albums whose items were dispatched.
    pub albums: usize,
    /// Album listings that stopped before their last page.
    pub incomplete_albums: usize,
    /// Files downloaded in this run.
    pub files_downloaded: usize,
    /// Files already present on disk with the expected size.
    pub files_present: usize,
    /// Videos skipped because the server is still processing them.
    pub skipped_processing: usize,
    /// Items without a usable filename.
    pub invalid_names: usize,
    /// Failed video lookups and downloads.
    pub failures: usize,
    /// Items not started because the run was cancelled.
    pub cancelled: usize,
    /// Total bytes downloaded.
    pub total_bytes: u64,
    /// Total elapsed time for the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns the average download speed in bytes per second.
    #[must_use]
    pub fn average_speed(&self) -> u64 {
        bytes_per_sec(self.total_bytes, self.elapsed)
    }

    /// Returns true if nothing failed and every listing was complete.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failures == 0 && self.invalid_names == 0 && self.incomplete_albums == 0
    }
}

/// Accumulates [`RunSummary`] totals album by album.
pub struct RunSummaryBuilder {
    summary: RunSummary,
    start_time: Instant,
}

impl Default for RunSummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummaryBuilder {
    /// Starts timing a run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            summary: RunSummary::default(),
            start_time: Instant::now(),
        }
    }

    /// Adds the outcome of one album's dispatch.
    pub fn add_album(&mut self, report: &DispatchReport, complete_listing: bool) {
        let s = &mut self.summary;
        s.albums += 1;
        if !complete_listing {
            s.incomplete_albums += 1;
        }
        s.files_downloaded += report.downloaded();
        s.files_present += report.already_present();
        s.skipped_processing += report.processing();
        s.invalid_names += report.invalid_names();
        s.failures += report.failures();
        s.cancelled += report.cancelled();
        s.total_bytes += report.bytes_downloaded();
    }

    /// Builds the final summary.
    #[must_use]
    pub fn build(mut self) -> RunSummary {
        self.summary.elapsed = self.start_time.elapsed();
        self.summary
    }
}
