//! Response envelopes returned by the SmugMug v2 API.
//!
//! Field names follow the wire format exactly; anything the backup does not
//! need is left out and missing fields fall back to their defaults.

use serde::Deserialize;

use crate::paginate::{Page, Paged};

/// A `{"Uri": "..."}` reference to another API resource.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct UriRef {
    pub uri: String,
}

/// Pagination block attached to collection responses.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct Pages {
    pub total: u64,
    pub next_page: String,
}

// ============================================================================
// User
// ============================================================================

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserResponse {
    pub response: UserBody,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserBody {
    pub user: User,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    pub name: String,
    pub uris: UserUris,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserUris {
    pub user_albums: UriRef,
}

// ============================================================================
// Albums
// ============================================================================

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumsResponse {
    pub response: AlbumsBody,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumsBody {
    pub album: Vec<Album>,
    pub pages: Pages,
}

/// An album on the remote account.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct Album {
    pub album_key: String,
    pub name: String,
    /// Logical path of the album on the site, e.g. `/Travel/Iceland`.
    pub url_path: String,
    pub uris: AlbumUris,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumUris {
    pub album_images: UriRef,
}

impl Album {
    /// URI of the first page of this album's media items.
    #[must_use]
    pub fn images_uri(&self) -> &str {
        &self.uris.album_images.uri
    }
}

impl Paged for AlbumsResponse {
    type Item = Album;

    fn into_page(self) -> Page<Album> {
        Page {
            items: self.response.album,
            next_page: self.response.pages.next_page,
        }
    }
}

// ============================================================================
// Album images
// ============================================================================

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumImagesResponse {
    pub response: AlbumImagesBody,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumImagesBody {
    pub album_image: Vec<AlbumImage>,
    pub pages: Pages,
}

/// One image or video inside an album.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumImage {
    pub file_name: String,
    pub image_key: String,
    pub upload_key: String,
    pub archived_uri: String,
    pub archived_size: u64,
    #[serde(rename = "ArchivedMD5")]
    pub archived_md5: String,
    pub is_video: bool,
    /// Set while the server is still transcoding a video.
    pub processing: bool,
    pub uris: AlbumImageUris,
    /// Path of the owning album. Filled in locally, never sent by the API.
    #[serde(skip)]
    pub album_path: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumImageUris {
    pub largest_video: UriRef,
}

impl AlbumImage {
    /// Best human-readable identifier for log lines.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.file_name.is_empty() {
            &self.image_key
        } else {
            &self.file_name
        }
    }
}

impl Paged for AlbumImagesResponse {
    type Item = AlbumImage;

    fn into_page(self) -> Page<AlbumImage> {
        Page {
            items: self.response.album_image,
            next_page: self.response.pages.next_page,
        }
    }
}

// ============================================================================
// Largest video
// ============================================================================

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumVideoResponse {
    pub response: AlbumVideoBody,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlbumVideoBody {
    pub largest_video: LargestVideo,
}

/// Concrete rendition returned by the `!largestvideo` endpoint.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct LargestVideo {
    pub url: String,
    pub size: u64,
}
