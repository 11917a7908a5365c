//! smugmug-backup - A library for backing up a SmugMug account to local storage.
//!
//! Albums and their media items are enumerated through the paginated v2 API,
//! each item is resolved to a concrete download (videos need a second lookup
//! for their largest rendition) and then stored below a destination folder.
//! A failing item never stops the rest of the batch.
//!
//! # Example
//!
//! ```no_run
//! use smugmug_backup::{AppConfig, Worker};
//!
//! # async fn example() -> smugmug_backup::Result<()> {
//! let config = AppConfig::load(&AppConfig::default_path())?;
//! let worker = Worker::new(config)?;
//! let summary = worker.run().await?;
//! println!("Downloaded {} files", summary.files_downloaded);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod api;
pub mod config;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod format;
pub mod fs;
pub mod media;
pub mod paginate;
pub mod stats;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::{Album, AlbumImage, HttpRequestHandler, RequestHandler};
pub use config::{ApiConfig, AppConfig, AuthConfig, DownloadConfig, StoreConfig};
pub use dispatch::{DispatchReport, DispatchReporter, Dispatcher, LogReport, NoReport, Outcome};
pub use download::{Download, DownloadStatus, HttpDownload};
pub use error::{Error, Result};
pub use format::{format_bytes, format_duration, format_summary};
pub use fs::{FileSystem, TokioFileSystem};
pub use media::{FilenameTemplate, ItemError, MediaKind, ResolvedDownload, Resolver};
pub use paginate::{Enumerator, Listing, Page, Paged};
pub use stats::{FileStats, RunSummary};
pub use worker::Worker;
