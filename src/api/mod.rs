//! Access to the remote photo API.

pub mod models;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::error::{Error, Result};

pub use models::{Album, AlbumImage, AlbumImagesResponse, AlbumsResponse, AlbumVideoResponse};

/// Issues GET requests against the API and returns the decoded JSON body.
///
/// Transport failures, non-success statuses and undecodable bodies are all
/// reported through the returned error. Retries, if any, belong here.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Fetches `uri` and returns its JSON body.
    async fn get(&self, uri: &str) -> Result<serde_json::Value>;
}

/// Fetches `uri` and decodes the body into `T`.
///
/// # Errors
///
/// Returns the handler's error, or [`Error::Json`] if the body does not
/// match `T`.
pub async fn fetch<T, H>(handler: &H, uri: &str) -> Result<T>
where
    T: DeserializeOwned,
    H: RequestHandler + ?Sized,
{
    let value = handler.get(uri).await?;
    Ok(serde_json::from_value(value)?)
}

/// Returns the URI of the first page of `username`'s albums.
///
/// An empty string means the account exposes no album list.
///
/// # Errors
///
/// Returns an error if the user lookup fails.
pub async fn user_albums_uri<H>(handler: &H, username: &str) -> Result<String>
where
    H: RequestHandler + ?Sized,
{
    let user: models::UserResponse = fetch(handler, &format!("/api/v2/user/{username}")).await?;
    Ok(user.response.user.uris.user_albums.uri)
}

/// Builds the HTTP client shared by API requests and downloads.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// [`RequestHandler`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRequestHandler {
    client: reqwest::Client,
    base_url: String,
    authorization: Option<String>,
}

impl HttpRequestHandler {
    /// Creates a handler from an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, authorization: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
        }
    }

    /// Creates a handler configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = build_http_client(Duration::from_secs(config.api.timeout_secs))?;
        Ok(Self::new(
            client,
            &config.api.base_url,
            config.auth.authorization.clone(),
        ))
    }

    /// The underlying client, for sharing its connection pool with downloads.
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Resolves an API URI, which is usually host-relative, to an absolute URL.
    #[must_use]
    pub fn absolute_url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else if uri.starts_with('/') {
            format!("{}{uri}", self.base_url)
        } else {
            format!("{}/{uri}", self.base_url)
        }
    }
}

#[async_trait]
impl RequestHandler for HttpRequestHandler {
    async fn get(&self, uri: &str) -> Result<serde_json::Value> {
        let url = self.absolute_url(uri);
        log::debug!("GET {url}");

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(ref authorization) = self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
