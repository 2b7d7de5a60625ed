//! Store client error types

use thiserror::Error;

/// Errors that can occur when talking to the document store
#[derive(Error, Debug)]
pub enum ClientError {
    /// The connection could not be established
    #[error("Document store unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The store answered, but not in the shape we expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Classify a transport-level failure
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err)
        } else if err.is_connect() {
            ClientError::Unavailable(err)
        } else {
            ClientError::Request(err)
        }
    }
}

/// Result type alias for store client operations
pub type ClientResult<T> = Result<T, ClientError>;
