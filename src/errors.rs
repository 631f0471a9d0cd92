//! Error types for gempawatch.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur while fetching and decoding a feed.
///
/// Every variant degrades to "feed unavailable" in the presentation layer;
/// none of them is fatal to the process.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (network error or timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("BMKG API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Top-level payload could not be decoded as JSON
    #[error("Failed to parse feed payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether the failure happened on the wire rather than while decoding.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. })
    }
}
