//! In-memory document store
//!
//! Implements the full client contract against process memory, mirroring the
//! behaviour the node store relies on from a real cluster:
//!
//! - indices are created implicitly on first write
//! - a new index joins the aliases of every template whose pattern it matches
//! - targets are comma-separated lists of names, aliases and `*` patterns

use super::{
    pattern_matches, BulkItemResult, BulkOperation, ClientResult, DocumentRef, DocumentStore,
    FetchedDocument, MultiGetItem, TemplateWrite,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Index {
    docs: BTreeMap<String, Value>,
    aliases: BTreeSet<String>,
}

impl Index {
    fn is_target(&self, name: &str, target: &str) -> bool {
        target.split(',').any(|part| {
            pattern_matches(part, name) || self.aliases.iter().any(|a| pattern_matches(part, a))
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    templates: HashMap<String, Value>,
    indices: BTreeMap<String, Index>,
}

impl MemoryState {
    /// The index with this name, created from matching templates if new
    fn open(&mut self, name: &str) -> &mut Index {
        let aliases = if self.indices.contains_key(name) {
            BTreeSet::new()
        } else {
            self.template_aliases(name)
        };
        self.indices
            .entry(name.to_string())
            .or_insert_with(|| Index {
                docs: BTreeMap::new(),
                aliases,
            })
    }

    fn template_aliases(&self, index: &str) -> BTreeSet<String> {
        self.templates
            .values()
            .filter(|body| {
                body.get("index_patterns")
                    .and_then(Value::as_array)
                    .map(|patterns| {
                        patterns
                            .iter()
                            .filter_map(Value::as_str)
                            .any(|pattern| pattern_matches(pattern, index))
                    })
                    .unwrap_or(false)
            })
            .filter_map(|body| body.pointer("/template/aliases").and_then(Value::as_object))
            .flat_map(|aliases| aliases.keys().cloned())
            .collect()
    }
}

/// Document store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index, as an operator or another writer would
    pub async fn create_index(&self, name: &str) {
        self.state.write().await.open(name);
    }

    /// Body of a stored template
    pub async fn template(&self, name: &str) -> Option<Value> {
        self.state.read().await.templates.get(name).cloned()
    }

    /// Names of all indices, sorted
    pub async fn index_names(&self) -> Vec<String> {
        self.state.read().await.indices.keys().cloned().collect()
    }

    /// Number of documents in an index (0 if it does not exist)
    pub async fn document_count(&self, index: &str) -> usize {
        self.state
            .read()
            .await
            .indices
            .get(index)
            .map(|entry| entry.docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn index_template_exists(&self, name: &str) -> ClientResult<bool> {
        Ok(self.state.read().await.templates.contains_key(name))
    }

    async fn put_index_template(&self, name: &str, body: &Value) -> ClientResult<TemplateWrite> {
        let mut state = self.state.write().await;
        if state.templates.contains_key(name) {
            return Ok(TemplateWrite::AlreadyExists);
        }
        state.templates.insert(name.to_string(), body.clone());
        Ok(TemplateWrite::Created)
    }

    async fn index_document(&self, index: &str, id: &str, source: &Value) -> ClientResult<()> {
        self.state
            .write()
            .await
            .open(index)
            .docs
            .insert(id.to_string(), source.clone());
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> ClientResult<Option<Value>> {
        let state = self.state.read().await;
        Ok(state
            .indices
            .get(index)
            .and_then(|entry| entry.docs.get(id))
            .cloned())
    }

    async fn delete_document(&self, index: &str, id: &str) -> ClientResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .indices
            .get_mut(index)
            .map(|entry| entry.docs.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> ClientResult<Vec<BulkItemResult>> {
        let mut state = self.state.write().await;
        let results = operations
            .iter()
            .map(|op| {
                let status = match op {
                    BulkOperation::Index { index, id, source } => {
                        match state.open(index).docs.insert(id.clone(), source.clone()) {
                            Some(_) => 200,
                            None => 201,
                        }
                    }
                    BulkOperation::Delete { index, id } => {
                        let removed = state
                            .indices
                            .get_mut(index)
                            .map(|entry| entry.docs.remove(id).is_some())
                            .unwrap_or(false);
                        if removed {
                            200
                        } else {
                            404
                        }
                    }
                };
                BulkItemResult {
                    index: op.index().to_string(),
                    id: op.id().to_string(),
                    status,
                    error: None,
                }
            })
            .collect();
        Ok(results)
    }

    async fn multi_get(&self, refs: &[DocumentRef]) -> ClientResult<Vec<MultiGetItem>> {
        let state = self.state.read().await;
        Ok(refs
            .iter()
            .map(|r| MultiGetItem {
                index: r.index.clone(),
                id: r.id.clone(),
                outcome: Ok(state
                    .indices
                    .get(&r.index)
                    .and_then(|entry| entry.docs.get(&r.id))
                    .cloned()),
            })
            .collect())
    }

    async fn search_ids(&self, target: &str, ids: &[String]) -> ClientResult<Vec<FetchedDocument>> {
        let state = self.state.read().await;
        let mut found = Vec::new();
        for (name, index) in state
            .indices
            .iter()
            .filter(|(name, index)| index.is_target(name, target))
        {
            for id in ids {
                if let Some(source) = index.docs.get(id) {
                    found.push(FetchedDocument {
                        index: name.clone(),
                        id: id.clone(),
                        source: source.clone(),
                    });
                }
            }
        }
        Ok(found)
    }

    async fn delete_by_ids(&self, target: &str, ids: &[String]) -> ClientResult<u64> {
        let mut state = self.state.write().await;
        let mut deleted = 0;
        for (_, index) in state
            .indices
            .iter_mut()
            .filter(|(name, index)| index.is_target(name, target))
        {
            for id in ids {
                if index.docs.remove(id).is_some() {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn list_indices(&self, target: &str) -> ClientResult<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .indices
            .iter()
            .filter(|(name, index)| index.is_target(name, target))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete_index(&self, index: &str) -> ClientResult<()> {
        self.state.write().await.indices.remove(index);
        Ok(())
    }
}
