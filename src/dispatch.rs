//! Per-item download dispatch with failure isolation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::api::RequestHandler;
use crate::api::models::AlbumImage;
use crate::download::{Download, DownloadStatus};
use crate::format::format_bytes;
use crate::media::{ItemError, Resolver};
use crate::stats::FileStats;

/// Receives one callback per dispatched item.
///
/// All methods have default no-op implementations for convenience.
pub trait DispatchReporter: Send + Sync {
    /// Called after an item was stored.
    fn on_downloaded(&self, _item: &AlbumImage, _dest: &Path, _stats: &FileStats) {}

    /// Called when the destination already held a complete copy.
    fn on_already_present(&self, _item: &AlbumImage, _dest: &Path) {}

    /// Called when an item was not downloaded.
    fn on_skipped(&self, _item: &AlbumImage, _reason: &ItemError) {}
}

/// A reporter that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReport;

impl DispatchReporter for NoReport {}

/// Reports item outcomes through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReport;

impl DispatchReporter for LogReport {
    fn on_downloaded(&self, _item: &AlbumImage, dest: &Path, stats: &FileStats) {
        log::info!("Saved {} ({})", dest.display(), format_bytes(stats.size));
    }

    fn on_already_present(&self, _item: &AlbumImage, dest: &Path) {
        log::debug!("{} already present", dest.display());
    }

    fn on_skipped(&self, item: &AlbumImage, reason: &ItemError) {
        match reason {
            ItemError::Processing { .. } => log::info!("{reason}"),
            ItemError::Cancelled => log::debug!("{}: {reason}", item.label()),
            ItemError::InvalidName { .. } | ItemError::ResolutionFailed { .. } => {
                log::warn!("{reason}");
            }
            ItemError::Download { .. } => log::error!("{reason}"),
        }
    }
}

/// What happened to one item.
#[derive(Debug)]
pub enum Outcome {
    /// The item was stored at `dest`.
    Downloaded {
        /// Destination path.
        dest: PathBuf,
        /// Transfer statistics.
        stats: FileStats,
    },
    /// `dest` already held a complete copy.
    AlreadyPresent {
        /// Destination path.
        dest: PathBuf,
    },
    /// The item was not downloaded.
    Skipped(ItemError),
}

/// Outcome of one item, labelled for reporting.
#[derive(Debug)]
pub struct ItemOutcome {
    /// File name or image key of the item.
    pub label: String,
    /// What happened.
    pub outcome: Outcome,
}

/// Outcomes of a dispatched batch, in input order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl DispatchReport {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Downloaded { .. }))
    }

    #[must_use]
    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, Outcome::AlreadyPresent { .. }))
    }

    #[must_use]
    pub fn processing(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(ItemError::Processing { .. })))
    }

    #[must_use]
    pub fn invalid_names(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(ItemError::InvalidName { .. })))
    }

    /// Failed video lookups plus failed downloads.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                Outcome::Skipped(ItemError::ResolutionFailed { .. } | ItemError::Download { .. })
            )
        })
    }

    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(ItemError::Cancelled)))
    }

    /// Bytes written by successful downloads.
    #[must_use]
    pub fn bytes_downloaded(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                Outcome::Downloaded { stats, .. } => Some(stats.size),
                _ => None,
            })
            .sum()
    }
}

/// Hands out one async lock per destination path.
#[derive(Default)]
struct DestLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DestLocks {
    fn get(&self, dest: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(dest.to_path_buf()).or_default())
    }
}

/// Resolves and downloads a batch of album items.
///
/// Every item yields exactly one [`ItemOutcome`]; no failure stops the batch.
/// Downloads start in input order with at most `concurrency` in flight.
/// Items resolving to the same destination are downloaded one at a time.
pub struct Dispatcher<'a, H: RequestHandler + ?Sized, D: Download + ?Sized> {
    resolver: Resolver<'a, H>,
    downloader: &'a D,
    reporter: &'a dyn DispatchReporter,
    concurrency: usize,
    cancel: Option<CancellationToken>,
    dest_locks: DestLocks,
}

impl<'a, H: RequestHandler + ?Sized, D: Download + ?Sized> Dispatcher<'a, H, D> {
    /// Creates a sequential dispatcher that reports nothing.
    #[must_use]
    pub fn new(resolver: Resolver<'a, H>, downloader: &'a D) -> Self {
        Self {
            resolver,
            downloader,
            reporter: &NoReport,
            concurrency: 1,
            cancel: None,
            dest_locks: DestLocks::default(),
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: &'a dyn DispatchReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the maximum number of items processed at once.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Items not yet started when `token` is cancelled are reported as
    /// [`ItemError::Cancelled`]; in-flight downloads finish.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Processes `items`, storing them below `folder`.
    pub async fn dispatch(&self, items: &[AlbumImage], folder: &Path) -> DispatchReport {
        let outcomes: Vec<ItemOutcome> = stream::iter(items)
            .map(|item| self.process(item, folder))
            .buffered(self.concurrency)
            .collect()
            .await;
        DispatchReport { outcomes }
    }

    async fn process(&self, item: &AlbumImage, folder: &Path) -> ItemOutcome {
        let outcome = self.outcome(item, folder).await;
        match &outcome {
            Outcome::Downloaded { dest, stats } => self.reporter.on_downloaded(item, dest, stats),
            Outcome::AlreadyPresent { dest } => self.reporter.on_already_present(item, dest),
            Outcome::Skipped(reason) => self.reporter.on_skipped(item, reason),
        }
        ItemOutcome {
            label: item.label().to_string(),
            outcome,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    async fn outcome(&self, item: &AlbumImage, folder: &Path) -> Outcome {
        if self.is_cancelled() {
            return Outcome::Skipped(ItemError::Cancelled);
        }
        let resolved = match self.resolver.resolve(item, folder).await {
            Ok(resolved) => resolved,
            Err(reason) => return Outcome::Skipped(reason),
        };

        let lock = self.dest_locks.get(&resolved.dest);
        let _guard = lock.lock().await;
        if self.is_cancelled() {
            return Outcome::Skipped(ItemError::Cancelled);
        }

        match self
            .downloader
            .download(&resolved.dest, &resolved.url, resolved.size)
            .await
        {
            Ok(DownloadStatus::Downloaded(stats)) => Outcome::Downloaded {
                dest: resolved.dest,
                stats,
            },
            Ok(DownloadStatus::AlreadyPresent) => Outcome::AlreadyPresent {
                dest: resolved.dest,
            },
            Err(source) => Outcome::Skipped(ItemError::Download {
                dest: resolved.dest,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FilenameTemplate;
    use crate::config::DownloadConfig;
    use crate::download::HttpDownload;
    use crate::testing::{MockDownload, MockRequestHandler};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image(name: &str) -> AlbumImage {
        AlbumImage {
            file_name: name.to_string(),
            image_key: format!("key-{name}"),
            archived_uri: format!("https://photos.example/{name}"),
            archived_size: 10,
            ..AlbumImage::default()
        }
    }

    fn video(name: &str, processing: bool) -> AlbumImage {
        let mut v = image(name);
        v.is_video = true;
        v.processing = processing;
        v.uris.largest_video.uri = format!("/video/{name}");
        v
    }

    #[derive(Default)]
    struct RecordingReport {
        events: Mutex<Vec<String>>,
    }

    impl DispatchReporter for RecordingReport {
        fn on_downloaded(&self, item: &AlbumImage, _dest: &Path, _stats: &FileStats) {
            self.events.lock().unwrap().push(format!("ok {}", item.label()));
        }

        fn on_skipped(&self, item: &AlbumImage, reason: &ItemError) {
            let kind = match reason {
                ItemError::Processing { .. } => "processing",
                ItemError::InvalidName { .. } => "invalid",
                ItemError::ResolutionFailed { .. } => "unresolved",
                ItemError::Download { .. } => "failed",
                ItemError::Cancelled => "cancelled",
            };
            self.events.lock().unwrap().push(format!("{kind} {}", item.label()));
        }
    }

    #[tokio::test]
    async fn failing_download_does_not_stop_batch() {
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new().failing("/out/2.jpg");
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader);

        let items = [image("1.jpg"), image("2.jpg"), image("3.jpg")];
        let report = dispatcher.dispatch(&items, Path::new("/out")).await;

        let dests: Vec<_> = downloader.calls().into_iter().map(|(d, _, _)| d).collect();
        assert_eq!(
            dests,
            [
                PathBuf::from("/out/1.jpg"),
                PathBuf::from("/out/2.jpg"),
                PathBuf::from("/out/3.jpg")
            ]
        );
        assert_eq!(report.downloaded(), 2);
        assert_eq!(report.failures(), 1);
        assert!(matches!(
            report.outcomes[1].outcome,
            Outcome::Skipped(ItemError::Download { .. })
        ));
    }

    #[tokio::test]
    async fn processing_video_never_reaches_downloader() {
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new();
        let reporter = RecordingReport::default();
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader)
            .with_reporter(&reporter);

        let items = [video("clip.mov", true), image("after.jpg")];
        let report = dispatcher.dispatch(&items, Path::new("/out")).await;

        assert_eq!(downloader.calls().len(), 1);
        assert_eq!(downloader.calls()[0].0, PathBuf::from("/out/after.jpg"));
        assert_eq!(report.processing(), 1);
        assert_eq!(
            *reporter.events.lock().unwrap(),
            ["processing clip.mov", "ok after.jpg"]
        );
    }

    #[tokio::test]
    async fn unnamed_items_never_reach_downloader() {
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new();
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader);

        let items = [image(""), video("", false)];
        let report = dispatcher.dispatch(&items, Path::new("/out")).await;

        assert!(downloader.calls().is_empty());
        assert!(handler.calls().is_empty());
        assert_eq!(report.invalid_names(), 2);
    }

    #[tokio::test]
    async fn video_is_downloaded_from_largest_rendition() {
        let handler = MockRequestHandler::new().with(
            "/video/clip.mov",
            json!({ "Response": { "LargestVideo": { "Url": "https://x/y.mp4", "Size": 123 } } }),
        );
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new();
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader);

        dispatcher
            .dispatch(&[video("clip.mov", false)], Path::new("folder"))
            .await;

        assert_eq!(
            downloader.calls(),
            [(
                PathBuf::from("folder/clip.mov"),
                "https://x/y.mp4".to_string(),
                123
            )]
        );
    }

    #[tokio::test]
    async fn failed_video_lookup_is_isolated() {
        let handler = MockRequestHandler::new().failing("/video/bad.mov");
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new();
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader);

        let items = [video("bad.mov", false), image("ok.jpg")];
        let report = dispatcher.dispatch(&items, Path::new("/out")).await;

        assert_eq!(report.failures(), 1);
        assert_eq!(report.downloaded(), 1);
        assert_eq!(downloader.calls().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_dispatch_keeps_input_order() {
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new().failing("/out/3.jpg");
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader)
            .with_concurrency(4);

        let items: Vec<_> = (1..=6).map(|i| image(&format!("{i}.jpg"))).collect();
        let report = dispatcher.dispatch(&items, Path::new("/out")).await;

        let labels: Vec<_> = report.outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg", "6.jpg"]);
        assert_eq!(downloader.calls().len(), 6);
        assert_eq!(report.downloaded(), 5);
        assert_eq!(report.bytes_downloaded(), 50);
    }

    #[tokio::test]
    async fn same_named_items_do_not_share_a_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"hello".to_vec())
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = HttpDownload::new(reqwest::Client::new(), DownloadConfig::default());
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader)
            .with_concurrency(4);

        let mut first = image("a.jpg");
        first.archived_uri = format!("{}/a.jpg", server.uri());
        first.archived_size = 5;
        let mut second = first.clone();
        second.image_key = "key-other".to_string();
        let report = dispatcher.dispatch(&[first, second], dir.path()).await;

        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.already_present(), 1);
        assert_eq!(report.failures(), 0);
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"hello");
        assert!(!dir.path().join("a.jpg.part").exists());
    }

    #[tokio::test]
    async fn cancelled_dispatch_starts_nothing() {
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new();
        let token = CancellationToken::new();
        token.cancel();
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader)
            .with_cancellation(token);

        let report = dispatcher
            .dispatch(&[image("a.jpg"), image("b.jpg")], Path::new("/out"))
            .await;

        assert!(downloader.calls().is_empty());
        assert_eq!(report.cancelled(), 2);
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_report() {
        let handler = MockRequestHandler::new();
        let template = FilenameTemplate::default();
        let downloader = MockDownload::new();
        let dispatcher = Dispatcher::new(Resolver::new(&handler, &template), &downloader);
        let report = dispatcher.dispatch(&[], Path::new("/out")).await;
        assert!(report.outcomes.is_empty());
    }
}
