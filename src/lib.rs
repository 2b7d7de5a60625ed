//! # nodestore-opensearch
//!
//! Key/value storage for opaque event payloads on OpenSearch, partitioned
//! into one index per UTC day.
//!
//! ## Features
//!
//! - **Daily buckets**: index names derived from record creation time
//! - **Template bootstrap**: shards, replicas and codec applied to every new index
//! - **Retention**: whole expired indices deleted by cutoff
//! - **Batching**: bulk writes, reads and deletes with per-item results
//!
//! ## Modules
//!
//! - [`storage`]: `NodeStore`, the CRUD surface
//! - [`index`]: index naming, template bootstrap, cleanup
//! - [`client`]: the document store contract and its implementations
//! - [`config`]: configuration loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nodestore_opensearch::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     telemetry::init_logging(&config.logging)?;
//!
//!     // The client is shared with the rest of the application
//!     let client = Arc::new(OpenSearchClient::new(config.opensearch.clone())?);
//!     let store = NodeStore::new(client, config.nodestore.clone());
//!     store.bootstrap().await?;
//!
//!     store.set("evt-1", b"payload", None).await?;
//!
//!     // Periodically: drop buckets older than 90 days
//!     let cutoff = chrono::Utc::now() - chrono::Duration::days(90);
//!     let report = store.cleanup(cutoff).await?;
//!     println!("deleted {} indices", report.deleted.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod index;
pub mod storage;
pub mod telemetry;

// Re-export top-level types for convenience
pub use client::{ClientError, DocumentStore, MemoryStore, OpenSearchClient, OpenSearchConfig};

pub use config::{Config, ConfigError, IndexCodec, LoggingConfig, NodeStoreConfig};

pub use index::{CleanupReport, IndexCleaner, IndexNamer, TemplateManager, TemplateStatus};

pub use storage::{
    BatchOutcome, ItemFailure, NodeKey, NodeStore, NodeStoreError, NodeStoreResult, NodeWrite,
};
