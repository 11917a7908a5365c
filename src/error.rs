//! Error types for the smugmug-backup library.

use thiserror::Error;

/// Errors that can occur while enumerating or downloading an account.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status code.
    #[error("{uri} returned HTTP {status}")]
    Status {
        /// Requested URI.
        uri: String,
        /// Status code returned by the server.
        status: u16,
    },

    /// Response body did not match the expected envelope.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response decoded but lacked a field the caller needs.
    #[error("{uri} response has no {field}")]
    MissingField {
        /// Requested URI.
        uri: String,
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// Fetching one page of a paginated collection failed.
    #[error("Error getting page {uri}: {source}")]
    Page {
        /// URI of the page that could not be fetched.
        uri: String,
        /// Underlying cause.
        #[source]
        source: Box<Error>,
    },

    /// Enumeration stopped after the configured page cap.
    #[error("Pagination stopped after {limit} pages")]
    PageLimit {
        /// Configured maximum number of pages.
        limit: usize,
    },

    /// The next-page cursor pointed back at a page already visited.
    #[error("Pagination cursor {uri} was already visited")]
    CursorCycle {
        /// Repeated cursor.
        uri: String,
    },

    /// Downloaded byte count differs from the size announced by the API.
    #[error("Size mismatch for {path}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Destination path.
        path: String,
        /// Size announced by the API.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// The run was cancelled before the operation could start or finish.
    #[error("Operation cancelled")]
    Cancelled,
}

/// A specialized `Result` type for smugmug-backup operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_names_uri_and_cause() {
        let err = Error::Page {
            uri: "/api/v2/album/abc!images?start=101".to_string(),
            source: Box::new(Error::Status {
                uri: "/api/v2/album/abc!images?start=101".to_string(),
                status: 502,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("/api/v2/album/abc!images?start=101"));
        assert!(msg.contains("502"));
    }

    #[test]
    fn missing_field_display() {
        let err = Error::MissingField {
            uri: "/api/v2/image/ik!largestvideo".to_string(),
            field: "LargestVideo.Url",
        };
        assert_eq!(
            err.to_string(),
            "/api/v2/image/ik!largestvideo response has no LargestVideo.Url"
        );
    }

    #[test]
    fn size_mismatch_display() {
        let err = Error::SizeMismatch {
            path: "out/a.jpg".to_string(),
            expected: 10,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "Size mismatch for out/a.jpg: expected 10 bytes, got 7"
        );
    }
}
