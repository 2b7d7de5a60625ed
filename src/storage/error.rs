//! Node store error types
//!
//! Not-found is never an error here: reads return `None` and deletes of
//! missing records succeed.

use crate::client::ClientError;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur in node store operations
#[derive(Error, Debug)]
pub enum NodeStoreError {
    /// Transport failure or store-side rejection; the cause is attached
    #[error("Backend failed: {0}")]
    Backend(#[source] ClientError),

    /// A request covering several batch items failed; each item carries it
    #[error("Batch {request} request failed: {source}")]
    BatchRequest {
        request: &'static str,
        #[source]
        source: Arc<ClientError>,
    },

    /// The store answered with something we cannot interpret
    #[error("Corrupt response: {0}")]
    CorruptResponse(String),
}

impl From<ClientError> for NodeStoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidResponse(message) => NodeStoreError::CorruptResponse(message),
            other => NodeStoreError::Backend(other),
        }
    }
}

impl From<serde_json::Error> for NodeStoreError {
    fn from(err: serde_json::Error) -> Self {
        NodeStoreError::CorruptResponse(err.to_string())
    }
}

/// Result type alias for node store operations
pub type NodeStoreResult<T> = Result<T, NodeStoreError>;
