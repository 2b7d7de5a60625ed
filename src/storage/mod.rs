//! Node storage
//!
//! This module provides the key/value surface for opaque event payloads:
//!
//! - **node_store**: CRUD and batch operations over daily bucket indices
//! - **codec**: payload compression + base64 for the `data` field
//! - **types**: wire document and batch result types
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   (id, bytes, ts) → IndexNamer(ts) → encode → upsert <prefix>-YYYY.MM.DD/_doc/id
//!
//! Read Path:
//!   (id, ts?) → IndexNamer(ts) → get → decode
//!             └─ not found, no ts → ids query over the alias → newest own bucket → decode
//!
//! Delete Path:
//!   (id, ts?) → IndexNamer(ts) → delete by id
//!             └─ no ts → delete by query over the other listed buckets
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use nodestore_opensearch::client::{OpenSearchClient, OpenSearchConfig};
//! use nodestore_opensearch::config::NodeStoreConfig;
//! use nodestore_opensearch::storage::NodeStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(OpenSearchClient::new(OpenSearchConfig::default())?);
//!     let store = NodeStore::new(client, NodeStoreConfig::default());
//!
//!     store.bootstrap().await?;
//!     store.set("evt-1", br#"{"a":1}"#, None).await?;
//!     let payload = store.get("evt-1", None).await?;
//!
//!     assert_eq!(payload.as_deref(), Some(&br#"{"a":1}"#[..]));
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod node_store;
pub mod types;

// Re-export commonly used types
pub use codec::{decode_payload, encode_payload};
pub use error::{NodeStoreError, NodeStoreResult};
pub use node_store::NodeStore;
pub use types::{BatchOutcome, ItemFailure, NodeDocument, NodeKey, NodeWrite};
