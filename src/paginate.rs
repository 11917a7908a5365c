//! Cursor-driven enumeration of paginated collections.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::api::{RequestHandler, fetch};
use crate::error::{Error, Result};

/// One decoded page of a collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub items: Vec<T>,
    /// Cursor of the next page. Empty when this is the last page.
    pub next_page: String,
}

/// A response envelope that carries one page of a collection.
pub trait Paged: DeserializeOwned {
    /// Element type of the collection.
    type Item;

    /// Splits the envelope into its items and next-page cursor.
    fn into_page(self) -> Page<Self::Item>;
}

/// Everything an enumeration retrieved, plus the error that stopped it early.
#[derive(Debug)]
pub struct Listing<T> {
    /// Items of every page fetched successfully, in page order.
    pub items: Vec<T>,
    /// Number of pages fetched successfully.
    pub pages: usize,
    /// Set when the enumeration stopped before the cursor was exhausted.
    pub error: Option<Error>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            error: None,
        }
    }
}

impl<T> Listing<T> {
    /// Returns true if every page was retrieved.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Converts into a `Result`, discarding partial items on error.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the enumeration, if any.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }

    /// Applies `f` to every retrieved item, keeping the error.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            pages: self.pages,
            error: self.error,
        }
    }
}

/// Follows next-page cursors until the collection is exhausted.
///
/// No retries happen at this layer. A failed page stops the enumeration and
/// the pages already retrieved are kept.
pub struct Enumerator<'a, H: RequestHandler + ?Sized> {
    handler: &'a H,
    max_pages: Option<usize>,
    cancel: Option<CancellationToken>,
}

impl<'a, H: RequestHandler + ?Sized> Enumerator<'a, H> {
    /// Creates an enumerator with no page cap.
    #[must_use]
    pub const fn new(handler: &'a H) -> Self {
        Self {
            handler,
            max_pages: None,
            cancel: None,
        }
    }

    /// Caps the number of pages a single enumeration may fetch.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Stops issuing requests once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Retrieves every page starting at `first_uri`.
    ///
    /// An empty `first_uri` yields an empty, complete listing without any
    /// request. Duplicates across pages are kept as returned.
    pub async fn enumerate<R: Paged>(&self, first_uri: &str) -> Listing<R::Item> {
        let mut listing = Listing::default();
        let mut visited = HashSet::new();
        let mut uri = first_uri.to_string();

        while !uri.is_empty() {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                listing.error = Some(Error::Cancelled);
                break;
            }
            if let Some(limit) = self.max_pages.filter(|&limit| listing.pages >= limit) {
                listing.error = Some(Error::PageLimit { limit });
                break;
            }
            if !visited.insert(uri.clone()) {
                listing.error = Some(Error::CursorCycle { uri });
                break;
            }

            match fetch::<R, H>(self.handler, &uri).await {
                Ok(response) => {
                    let page = response.into_page();
                    listing.items.extend(page.items);
                    listing.pages += 1;
                    uri = page.next_page;
                }
                Err(e) => {
                    listing.error = Some(Error::Page {
                        uri,
                        source: Box::new(e),
                    });
                    break;
                }
            }
        }

        listing
    }
}
