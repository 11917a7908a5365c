//! Media classification, file naming and download resolution.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::api::models::{AlbumImage, AlbumVideoResponse};
use crate::api::{RequestHandler, fetch};
use crate::error::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9]*)\}").expect("valid regex"));

/// Whether an item is a still image or a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies an album item.
    #[must_use]
    pub const fn of(image: &AlbumImage) -> Self {
        if image.is_video { Self::Video } else { Self::Image }
    }
}

/// Why an item was not downloaded.
#[derive(Error, Debug)]
pub enum ItemError {
    /// The server has not finished transcoding the video.
    #[error("Skipping video {name} because it is still being processed")]
    Processing {
        /// Item label.
        name: String,
    },

    /// No valid destination filename could be derived.
    #[error("Unable to find a valid filename for {key}, skipping")]
    InvalidName {
        /// Image key of the item.
        key: String,
    },

    /// The largest-video lookup failed.
    #[error("Cannot get URI for video {name} from {uri}: {source}")]
    ResolutionFailed {
        /// Item label.
        name: String,
        /// Secondary resource that was requested.
        uri: String,
        /// Underlying cause.
        #[source]
        source: Error,
    },

    /// The download collaborator failed.
    #[error("Download of {} failed: {source}", .dest.display())]
    Download {
        /// Destination path.
        dest: PathBuf,
        /// Underlying cause.
        #[source]
        source: Error,
    },

    /// The run was cancelled before this item was started.
    #[error("Cancelled before download")]
    Cancelled,
}

impl ItemError {
    /// Returns true for outcomes that are routine rather than failures.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::Processing { .. } | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FileName,
    ImageKey,
    ArchivedMd5,
    UploadKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Filename pattern with `{FileName}`, `{ImageKey}`, `{ArchivedMD5}` and
/// `{UploadKey}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    segments: Vec<Segment>,
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self {
            segments: vec![Segment::Field(Field::FileName)],
        }
    }
}

impl FilenameTemplate {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown placeholder.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            let field = match name.as_str() {
                "FileName" => Field::FileName,
                "ImageKey" => Field::ImageKey,
                "ArchivedMD5" => Field::ArchivedMd5,
                "UploadKey" => Field::UploadKey,
                other => {
                    return Err(Error::Config(format!(
                        "unknown filename placeholder {{{other}}}"
                    )));
                }
            };
            segments.push(Segment::Field(field));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Ok(Self { segments })
    }

    /// Renders the filename of `image`.
    ///
    /// Returns `None` when the result is not a usable single path component.
    #[must_use]
    pub fn render(&self, image: &AlbumImage) -> Option<String> {
        let name: String = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Field(Field::FileName) => image.file_name.as_str(),
                Segment::Field(Field::ImageKey) => image.image_key.as_str(),
                Segment::Field(Field::ArchivedMd5) => image.archived_md5.as_str(),
                Segment::Field(Field::UploadKey) => image.upload_key.as_str(),
            })
            .collect();
        is_valid_name(&name).then_some(name)
    }
}

/// Returns true if `name` can be used as a single file name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// A download ready to hand to the download collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownload {
    /// Where the file is stored.
    pub dest: PathBuf,
    /// URL of the rendition to fetch.
    pub url: String,
    /// Size announced by the API, in bytes.
    pub size: u64,
}

/// Turns album items into concrete downloads.
pub struct Resolver<'a, H: RequestHandler + ?Sized> {
    handler: &'a H,
    template: &'a FilenameTemplate,
    force_video_download: bool,
}

impl<'a, H: RequestHandler + ?Sized> Resolver<'a, H> {
    #[must_use]
    pub const fn new(handler: &'a H, template: &'a FilenameTemplate) -> Self {
        Self {
            handler,
            template,
            force_video_download: false,
        }
    }

    /// Resolves videos even while the server is still processing them.
    #[must_use]
    pub const fn with_force_video_download(mut self, force: bool) -> Self {
        self.force_video_download = force;
        self
    }

    /// Resolves `image` into a download below `folder`.
    ///
    /// # Errors
    ///
    /// Returns the [`ItemError`] explaining why the item cannot be downloaded.
    pub async fn resolve(
        &self,
        image: &AlbumImage,
        folder: &Path,
    ) -> std::result::Result<ResolvedDownload, ItemError> {
        match MediaKind::of(image) {
            MediaKind::Image => self.resolve_image(image, folder),
            MediaKind::Video => self.resolve_video(image, folder).await,
        }
    }

    fn destination(
        &self,
        image: &AlbumImage,
        folder: &Path,
    ) -> std::result::Result<PathBuf, ItemError> {
        self.template
            .render(image)
            .map(|name| folder.join(name))
            .ok_or_else(|| ItemError::InvalidName {
                key: image.image_key.clone(),
            })
    }

    fn resolve_image(
        &self,
        image: &AlbumImage,
        folder: &Path,
    ) -> std::result::Result<ResolvedDownload, ItemError> {
        let dest = self.destination(image, folder)?;
        Ok(ResolvedDownload {
            dest,
            url: image.archived_uri.clone(),
            size: image.archived_size,
        })
    }

    async fn resolve_video(
        &self,
        image: &AlbumImage,
        folder: &Path,
    ) -> std::result::Result<ResolvedDownload, ItemError> {
        if image.processing && !self.force_video_download {
            return Err(ItemError::Processing {
                name: image.label().to_string(),
            });
        }
        let dest = self.destination(image, folder)?;

        let uri = &image.uris.largest_video.uri;
        log::debug!("Getting {uri}");
        let video: AlbumVideoResponse =
            fetch(self.handler, uri)
                .await
                .map_err(|source| ItemError::ResolutionFailed {
                    name: image.label().to_string(),
                    uri: uri.clone(),
                    source,
                })?;

        let largest = video.response.largest_video;
        if largest.url.is_empty() {
            return Err(ItemError::ResolutionFailed {
                name: image.label().to_string(),
                uri: uri.clone(),
                source: Error::MissingField {
                    uri: uri.clone(),
                    field: "LargestVideo.Url",
                },
            });
        }

        Ok(ResolvedDownload {
            dest,
            url: largest.url,
            size: largest.size,
        })
    }
}
