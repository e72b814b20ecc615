//! Error types for backend communication.

use helio_spec::SpecError;
use thiserror::Error;

/// Errors that can occur when talking to the search backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or connection failure before a response was obtained.
    #[error("transport failure: {source}")]
    Transport {
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The backend rejected a select request, typically for query syntax.
    #[error("backend error: {message}")]
    Backend {
        /// Message extracted from the backend's error page.
        message: String,
    },

    /// The update endpoint returned a failure status.
    #[error("unexpected response: {message}")]
    UnexpectedResponse {
        /// Message extracted from the response, or the raw body.
        message: String,
    },

    /// A response body could not be decoded as JSON.
    #[error("malformed response body: {source}")]
    Json {
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// Search specification loading failed.
    #[error(transparent)]
    Spec(#[from] SpecError),
}
