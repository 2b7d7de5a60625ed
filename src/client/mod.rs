//! Document Store Client
//!
//! The contract this backend consumes from the search-engine document store,
//! plus two implementations:
//!
//! - **OpenSearchClient**: REST client speaking the OpenSearch HTTP API
//! - **MemoryStore**: in-process store for tests and embedding applications
//!
//! The client handle is owned by the caller and shared (via `Arc`) across all
//! operations; nothing in this crate closes or reconfigures it.

mod error;
mod memory;
mod opensearch;

pub use error::{ClientError, ClientResult};
pub use memory::MemoryStore;
pub use opensearch::{OpenSearchClient, OpenSearchConfig};

use async_trait::async_trait;
use serde_json::Value;

/// Operations the node store needs from the underlying document store.
///
/// Per-document lookups model "not found" as a value (`None` / `false`),
/// never as an error. Retries and backoff are the implementation's concern.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether an index template with this name exists
    async fn index_template_exists(&self, name: &str) -> ClientResult<bool>;

    /// Create an index template if no template with this name exists.
    ///
    /// Must not overwrite an existing template.
    async fn put_index_template(&self, name: &str, body: &Value) -> ClientResult<TemplateWrite>;

    /// Create or replace a document by id
    async fn index_document(&self, index: &str, id: &str, source: &Value) -> ClientResult<()>;

    /// Fetch a document's source by id
    async fn get_document(&self, index: &str, id: &str) -> ClientResult<Option<Value>>;

    /// Delete a document by id, returning whether it existed
    async fn delete_document(&self, index: &str, id: &str) -> ClientResult<bool>;

    /// Execute a batch of index/delete operations in one request.
    ///
    /// Returns one result per operation, in request order.
    async fn bulk(&self, operations: &[BulkOperation]) -> ClientResult<Vec<BulkItemResult>>;

    /// Fetch many documents in one request, one item per reference in order
    async fn multi_get(&self, refs: &[DocumentRef]) -> ClientResult<Vec<MultiGetItem>>;

    /// Find documents with the given ids in any index covered by `target`.
    ///
    /// A target is a comma-separated list of index names, aliases and `*`
    /// patterns. Missing indices are ignored. Only searchable (refreshed)
    /// documents are found.
    async fn search_ids(&self, target: &str, ids: &[String]) -> ClientResult<Vec<FetchedDocument>>;

    /// Delete documents with the given ids from every index covered by `target`.
    ///
    /// Like a search, this only sees refreshed documents.
    async fn delete_by_ids(&self, target: &str, ids: &[String]) -> ClientResult<u64>;

    /// Names of all indices covered by `target`
    async fn list_indices(&self, target: &str) -> ClientResult<Vec<String>>;

    /// Delete a whole index
    async fn delete_index(&self, index: &str) -> ClientResult<()>;
}

/// Outcome of a create-if-absent template request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateWrite {
    /// This request created the template
    Created,
    /// A template with the same name was already present
    AlreadyExists,
}

/// Location of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub index: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(index: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
        }
    }
}

/// A document returned by a search, with the index it was found in
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub index: String,
    pub id: String,
    pub source: Value,
}

/// One entry of a bulk request
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Index {
        index: String,
        id: String,
        source: Value,
    },
    Delete {
        index: String,
        id: String,
    },
}

impl BulkOperation {
    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Index { id, .. } | BulkOperation::Delete { id, .. } => id,
        }
    }

    pub fn index(&self) -> &str {
        match self {
            BulkOperation::Index { index, .. } | BulkOperation::Delete { index, .. } => index,
        }
    }
}

/// Per-operation result of a bulk request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    pub index: String,
    pub id: String,
    /// HTTP-style status of this item
    pub status: u16,
    /// Store-side error reason, if the item was rejected
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Per-document result of a multi-get request
#[derive(Debug)]
pub struct MultiGetItem {
    pub index: String,
    pub id: String,
    pub outcome: ClientResult<Option<Value>>,
}

/// Match an index name against a pattern where `*` matches any run of characters
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !name.starts_with(first) || name.len() < first.len() + last.len() {
        return false;
    }
    if !name[first.len()..].ends_with(last) {
        return false;
    }

    let mut rest = &name[first.len()..name.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}
