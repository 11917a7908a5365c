//! The backup run: albums, then album items, then downloads.

use std::path::{Component, Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::api::models::{Album, AlbumImage, AlbumImagesResponse, AlbumsResponse};
use crate::api::{HttpRequestHandler, RequestHandler, user_albums_uri};
use crate::config::AppConfig;
use crate::dispatch::{DispatchReport, DispatchReporter, Dispatcher, LogReport};
use crate::download::{Download, HttpDownload};
use crate::error::{Error, Result};
use crate::format::format_summary;
use crate::media::{FilenameTemplate, Resolver};
use crate::paginate::{Enumerator, Listing};
use crate::stats::{RunSummary, RunSummaryBuilder};

/// Maps an album's URL path to a relative folder, dropping anything that
/// could escape the destination.
#[must_use]
pub fn album_folder(url_path: &str) -> PathBuf {
    Path::new(url_path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Drives a complete backup of one account.
pub struct Worker<H: RequestHandler = HttpRequestHandler, D: Download = HttpDownload> {
    config: AppConfig,
    handler: H,
    downloader: D,
    template: FilenameTemplate,
    reporter: Box<dyn DispatchReporter>,
    cancel: CancellationToken,
}

impl Worker {
    /// Creates a worker talking HTTP to the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: AppConfig) -> Result<Self> {
        let handler = HttpRequestHandler::from_config(&config)?;
        let downloader = HttpDownload::new(handler.client().clone(), config.download.clone());
        Self::with_parts(config, handler, downloader)
    }
}

impl<H: RequestHandler, D: Download> Worker<H, D> {
    /// Creates a worker from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_parts(config: AppConfig, handler: H, downloader: D) -> Result<Self> {
        config.validate()?;
        let template = FilenameTemplate::parse(&config.store.file_names)?;
        Ok(Self {
            config,
            handler,
            downloader,
            template,
            reporter: Box::new(LogReport),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the default log-based reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl DispatchReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Returns a token that stops the run when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn enumerator(&self) -> Enumerator<'_, H> {
        Enumerator::new(&self.handler)
            .with_max_pages(self.config.api.max_pages)
            .with_cancellation(self.cancel.clone())
    }

    /// Lists every album starting at `first_uri`.
    pub async fn albums(&self, first_uri: &str) -> Listing<Album> {
        self.enumerator().enumerate::<AlbumsResponse>(first_uri).await
    }

    /// Lists every item of an album, tagging each with `album_path`.
    pub async fn album_images(&self, first_uri: &str, album_path: &str) -> Listing<AlbumImage> {
        self.enumerator()
            .enumerate::<AlbumImagesResponse>(first_uri)
            .await
            .map(|mut image| {
                image.album_path = album_path.to_string();
                image
            })
    }

    /// Downloads `images` into `folder`, isolating per-item failures.
    pub async fn save_images(&self, images: &[AlbumImage], folder: &Path) -> DispatchReport {
        let resolver = Resolver::new(&self.handler, &self.template)
            .with_force_video_download(self.config.download.force_video_download);
        Dispatcher::new(resolver, &self.downloader)
            .with_reporter(self.reporter.as_ref())
            .with_concurrency(self.config.download.concurrent_downloads)
            .with_cancellation(self.cancel.clone())
            .dispatch(images, folder)
            .await
    }

    /// Backs up every album of the configured account.
    ///
    /// Albums whose item listing fails part way are still backed up as far as
    /// they were listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the user lookup fails, if the album list could not
    /// be enumerated completely, or if the run was cancelled. Albums already
    /// listed are processed before the album-list error is returned.
    pub async fn run(&self) -> Result<RunSummary> {
        let first_uri = user_albums_uri(&self.handler, &self.config.api.username).await?;
        if first_uri.is_empty() {
            log::info!("No albums found for {}", self.config.api.username);
        }

        let Listing {
            items: albums,
            error: albums_error,
            ..
        } = self.albums(&first_uri).await;
        log::info!("Found {} albums", albums.len());

        let mut builder = RunSummaryBuilder::new();
        for album in &albums {
            if self.cancel.is_cancelled() {
                break;
            }
            let folder = self.config.store.destination.join(album_folder(&album.url_path));
            log::info!("Album {} -> {}", album.name, folder.display());

            let listing = self.album_images(album.images_uri(), &album.url_path).await;
            if let Some(ref e) = listing.error {
                log::warn!("Album {} listed partially: {e}", album.name);
            }

            let report = self.save_images(&listing.items, &folder).await;
            builder.add_album(&report, listing.is_complete());
        }

        let summary = builder.build();
        log::info!("{}", format_summary(&summary));

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match albums_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}
