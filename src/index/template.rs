//! Index template bootstrap
//!
//! Every daily index inherits shards, replicas, codec, mappings and the store's
//! alias from one index template. The template is created once and never
//! reconciled: changing the configuration afterwards requires an operator to
//! update or drop it.

use crate::client::{DocumentStore, TemplateWrite};
use crate::config::NodeStoreConfig;
use crate::storage::error::NodeStoreResult;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// How `ensure_template` found the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateStatus {
    /// It was already there; nothing was written
    Existing,
    /// This process created it
    Created,
    /// It was absent when checked but another writer created it first
    CreatedConcurrently,
}

/// Creates the index template at most once per manager
pub struct TemplateManager {
    store: Arc<dyn DocumentStore>,
    name: String,
    body: Value,
    ensured: OnceCell<TemplateStatus>,
}

impl TemplateManager {
    pub fn new(store: Arc<dyn DocumentStore>, config: &NodeStoreConfig) -> Self {
        Self {
            store,
            name: config.template_name(),
            body: build_template(config),
            ensured: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The template document submitted on creation
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Make sure the template exists.
    ///
    /// The first successful call talks to the store; later calls return the
    /// same status without any request. A failed attempt is not cached.
    pub async fn ensure_template(&self) -> NodeStoreResult<TemplateStatus> {
        self.ensured
            .get_or_try_init(|| self.create_if_absent())
            .await
            .copied()
    }

    async fn create_if_absent(&self) -> NodeStoreResult<TemplateStatus> {
        if self.store.index_template_exists(&self.name).await? {
            tracing::debug!(template = %self.name, "Index template already present");
            return Ok(TemplateStatus::Existing);
        }

        match self.store.put_index_template(&self.name, &self.body).await? {
            TemplateWrite::Created => {
                tracing::info!(template = %self.name, "Created index template");
                Ok(TemplateStatus::Created)
            }
            TemplateWrite::AlreadyExists => {
                tracing::info!(
                    template = %self.name,
                    "Index template was created concurrently by another writer"
                );
                Ok(TemplateStatus::CreatedConcurrently)
            }
        }
    }
}

/// Build the index template document for a configuration
pub fn build_template(config: &NodeStoreConfig) -> Value {
    let mut aliases = Map::new();
    aliases.insert(config.alias_name(), json!({}));

    json!({
        "index_patterns": [config.index_pattern()],
        "template": {
            "aliases": aliases,
            "settings": {
                "index": {
                    "number_of_shards": config.number_of_shards,
                    "number_of_replicas": config.number_of_replicas,
                    "codec": config.index_codec.as_str(),
                }
            },
            "mappings": {
                "dynamic": false,
                "properties": {
                    "id": { "type": "keyword" },
                    "data": { "type": "binary" },
                    "timestamp": { "type": "date" },
                }
            }
        },
        "_meta": {
            "managed_by": env!("CARGO_PKG_NAME"),
        }
    })
}
