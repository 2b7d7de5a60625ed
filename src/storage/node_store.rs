//! Node store
//!
//! Key/value surface over daily bucket indices:
//! - Write path: id + payload → bucket for timestamp → encode → upsert document
//! - Read path: id (+ timestamp hint) → bucket → fetch → decode
//!
//! The store handle is shared, never owned: nothing is locked or cached
//! between calls, and concurrent writes to the same id are resolved by the
//! store.
//!
//! Without a timestamp hint a record may live in any bucket. Reads then search
//! the store's alias, and deletes run by query over the buckets listed under
//! the index pattern. Either way only indices that parse as our own buckets
//! count, so stores with overlapping prefixes never see each other's records.

use crate::client::{
    BulkItemResult, BulkOperation, ClientError, ClientResult, DocumentRef, DocumentStore,
    FetchedDocument,
};
use crate::config::NodeStoreConfig;
use crate::index::{CleanupReport, IndexCleaner, IndexNamer, TemplateManager, TemplateStatus};
use crate::storage::codec::{decode_payload, encode_payload};
use crate::storage::error::{NodeStoreError, NodeStoreResult};
use crate::storage::types::{BatchOutcome, NodeDocument, NodeKey, NodeWrite};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Bucket names per delete-by-query request, keeping the request line short
const BUCKETS_PER_DELETE: usize = 64;

/// Key/value storage for opaque event payloads
pub struct NodeStore {
    store: Arc<dyn DocumentStore>,
    config: NodeStoreConfig,
    namer: IndexNamer,
    alias: String,
    templates: TemplateManager,
    cleaner: IndexCleaner,
}

impl NodeStore {
    pub fn new(store: Arc<dyn DocumentStore>, config: NodeStoreConfig) -> Self {
        let namer = IndexNamer::new(config.index_prefix.clone());
        Self {
            templates: TemplateManager::new(Arc::clone(&store), &config),
            cleaner: IndexCleaner::new(Arc::clone(&store), namer.clone()),
            alias: config.alias_name(),
            store,
            config,
            namer,
        }
    }

    pub fn config(&self) -> &NodeStoreConfig {
        &self.config
    }

    pub fn namer(&self) -> &IndexNamer {
        &self.namer
    }

    pub fn templates(&self) -> &TemplateManager {
        &self.templates
    }

    pub fn cleaner(&self) -> &IndexCleaner {
        &self.cleaner
    }

    /// Ensure the index template exists. Call once at startup, before writing.
    pub async fn bootstrap(&self) -> NodeStoreResult<TemplateStatus> {
        self.templates.ensure_template().await
    }

    /// Index a record with this creation time lives in
    pub fn index_for(&self, timestamp: Option<DateTime<Utc>>) -> String {
        self.namer.name_for(timestamp)
    }

    /// Store a payload, replacing any previous payload for `id` in the same bucket
    pub async fn set(
        &self,
        id: &str,
        data: &[u8],
        timestamp: Option<DateTime<Utc>>,
    ) -> NodeStoreResult<()> {
        let timestamp = timestamp.unwrap_or_else(Utc::now);
        let index = self.namer.name_for(Some(timestamp));
        let source = self.document(id, data, timestamp)?;

        tracing::debug!(id, index = %index, bytes = data.len(), "Writing node");
        self.store.index_document(&index, id, &source).await?;
        Ok(())
    }

    /// Fetch a payload; `None` when the record does not exist
    pub async fn get(
        &self,
        id: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> NodeStoreResult<Option<Vec<u8>>> {
        let index = self.namer.name_for(timestamp);

        if let Some(source) = self.store.get_document(&index, id).await? {
            return decode_document(id, source).map(Some);
        }
        if !self.searches_all_buckets(timestamp) {
            return Ok(None);
        }

        tracing::debug!(id, alias = %self.alias, "Node not in today's bucket, searching the alias");
        let hits = self.store.search_ids(&self.alias, &[id.to_string()]).await?;
        match self.newest_hit(hits, id) {
            Some(hit) => decode_document(id, hit.source).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a record. Deleting a missing record succeeds.
    ///
    /// Without a timestamp the record is deleted from today's bucket by id,
    /// which also catches a write the store has not refreshed yet, and then
    /// by query from every other bucket.
    pub async fn delete(&self, id: &str, timestamp: Option<DateTime<Utc>>) -> NodeStoreResult<()> {
        let index = self.namer.name_for(timestamp);
        let existed = self.store.delete_document(&index, id).await?;
        tracing::debug!(id, index = %index, existed, "Deleted node");

        if self.searches_all_buckets(timestamp) {
            self.delete_from_other_buckets(&index, &[id.to_string()])
                .await?;
        }
        Ok(())
    }

    /// Store many payloads in one bulk request.
    ///
    /// Items succeed or fail independently; only a failure of the request as a
    /// whole is returned as an error.
    pub async fn set_multi(&self, items: &[NodeWrite]) -> NodeStoreResult<BatchOutcome<()>> {
        if items.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let mut operations = Vec::with_capacity(items.len());
        for item in items {
            let timestamp = item.timestamp.unwrap_or_else(Utc::now);
            operations.push(BulkOperation::Index {
                index: self.namer.name_for(Some(timestamp)),
                id: item.id.clone(),
                source: self.document(&item.id, &item.data, timestamp)?,
            });
        }

        let results = self.store.bulk(&operations).await?;
        check_len("bulk", results.len(), operations.len())?;

        let mut outcome = BatchOutcome::default();
        for result in results {
            if result.is_success() {
                outcome.push_success(result.id, ());
            } else {
                tracing::warn!(
                    id = %result.id,
                    index = %result.index,
                    status = result.status,
                    "Bulk write rejected"
                );
                let id = result.id.clone();
                outcome.push_failure(id, rejected(result));
            }
        }
        Ok(outcome)
    }

    /// Fetch many payloads, with missing records reported as `None`
    pub async fn get_multi(
        &self,
        keys: &[NodeKey],
    ) -> NodeStoreResult<BatchOutcome<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let refs: Vec<DocumentRef> = keys
            .iter()
            .map(|key| DocumentRef::new(self.namer.name_for(key.timestamp), key.id.clone()))
            .collect();
        let items = self.store.multi_get(&refs).await?;
        check_len("multi-get", items.len(), refs.len())?;

        let mut slots: Vec<Option<NodeStoreResult<Option<Vec<u8>>>>> = Vec::with_capacity(keys.len());
        let mut unresolved = Vec::new();
        for (position, (key, item)) in keys.iter().zip(items).enumerate() {
            let slot = match item.outcome {
                Ok(Some(source)) => Some(decode_document(&key.id, source).map(Some)),
                Ok(None) if self.searches_all_buckets(key.timestamp) => {
                    unresolved.push(position);
                    None
                }
                Ok(None) => Some(Ok(None)),
                Err(e) => Some(Err(e.into())),
            };
            slots.push(slot);
        }

        if !unresolved.is_empty() {
            let ids: Vec<String> = unresolved.iter().map(|&p| keys[p].id.clone()).collect();
            tracing::debug!(count = ids.len(), "Searching all buckets for nodes without a timestamp");

            match self.store.search_ids(&self.alias, &ids).await {
                Ok(hits) => {
                    for position in unresolved {
                        let id = &keys[position].id;
                        let found =
                            self.newest_hit(hits.iter().filter(|h| &h.id == id).cloned(), id);
                        slots[position] = Some(match found {
                            Some(hit) => decode_document(id, hit.source).map(Some),
                            None => Ok(None),
                        });
                    }
                }
                Err(e) => {
                    let failure = shared_failure("search", e);
                    for position in unresolved {
                        slots[position] = Some(Err(failure()));
                    }
                }
            }
        }

        let mut outcome = BatchOutcome::default();
        for (key, slot) in keys.iter().zip(slots) {
            match slot.unwrap_or(Ok(None)) {
                Ok(value) => outcome.push_success(key.id.clone(), value),
                Err(e) => {
                    tracing::warn!(id = %key.id, error = %e, "Failed to fetch node");
                    outcome.push_failure(key.id.clone(), e);
                }
            }
        }
        Ok(outcome)
    }

    /// Delete many records. Missing records count as deleted.
    ///
    /// One bulk request deletes every key from its bucket (today's when it has
    /// no timestamp). Keys without a timestamp are then deleted by query from
    /// every other bucket; if that fails they are reported as failed, while
    /// the results of the bulk request stand.
    pub async fn delete_multi(&self, keys: &[NodeKey]) -> NodeStoreResult<BatchOutcome<()>> {
        if keys.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let today = self.namer.name_for(None);
        let operations: Vec<BulkOperation> = keys
            .iter()
            .map(|key| BulkOperation::Delete {
                index: match key.timestamp {
                    Some(ts) => self.namer.name_for(Some(ts)),
                    None => today.clone(),
                },
                id: key.id.clone(),
            })
            .collect();
        let results = self.store.bulk(&operations).await?;
        check_len("bulk", results.len(), operations.len())?;

        let mut outcome = BatchOutcome::default();
        let mut everywhere = Vec::new();
        for (key, result) in keys.iter().zip(results) {
            if !(result.is_success() || result.is_not_found()) {
                tracing::warn!(
                    id = %result.id,
                    index = %result.index,
                    status = result.status,
                    "Bulk delete rejected"
                );
                let id = result.id.clone();
                outcome.push_failure(id, rejected(result));
            } else if self.searches_all_buckets(key.timestamp) {
                everywhere.push(result.id);
            } else {
                outcome.push_success(result.id, ());
            }
        }

        if !everywhere.is_empty() {
            match self.delete_from_other_buckets(&today, &everywhere).await {
                Ok(_) => {
                    for id in everywhere {
                        outcome.push_success(id, ());
                    }
                }
                Err(e) => {
                    tracing::warn!(count = everywhere.len(), error = %e, "Delete by query failed");
                    let failure = shared_failure("delete by query", e);
                    for id in everywhere {
                        outcome.push_failure(id, failure());
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Delete every bucket index older than the cutoff's day
    pub async fn cleanup(&self, cutoff: DateTime<Utc>) -> NodeStoreResult<CleanupReport> {
        self.cleaner.cleanup(cutoff).await
    }

    /// Delete ids by query from every bucket except `current`.
    ///
    /// Buckets are named explicitly, so indices of other stores matching the
    /// same pattern are never touched.
    async fn delete_from_other_buckets(&self, current: &str, ids: &[String]) -> ClientResult<u64> {
        let buckets: Vec<String> = self
            .store
            .list_indices(&self.namer.pattern())
            .await?
            .into_iter()
            .filter(|index| index != current && self.namer.parse_bucket(index).is_some())
            .collect();

        let mut deleted = 0;
        for chunk in buckets.chunks(BUCKETS_PER_DELETE) {
            deleted += self.store.delete_by_ids(&chunk.join(","), ids).await?;
        }
        tracing::debug!(
            buckets = buckets.len(),
            requested = ids.len(),
            deleted,
            "Deleted nodes from other buckets"
        );
        Ok(deleted)
    }

    /// The hit from the latest of our buckets, should an id exist in more than one.
    /// Hits from indices that are not our buckets are dropped.
    fn newest_hit(
        &self,
        hits: impl IntoIterator<Item = FetchedDocument>,
        id: &str,
    ) -> Option<FetchedDocument> {
        hits.into_iter()
            .filter(|hit| hit.id == id)
            .filter_map(|hit| self.namer.parse_bucket(&hit.index).map(|day| (day, hit)))
            .max_by_key(|(day, _)| *day)
            .map(|(_, hit)| hit)
    }

    /// Whether a lookup without a timestamp hint should cover every bucket
    fn searches_all_buckets(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        timestamp.is_none() && self.config.search_fallback
    }

    fn document(&self, id: &str, data: &[u8], timestamp: DateTime<Utc>) -> NodeStoreResult<Value> {
        let document = NodeDocument {
            id: id.to_string(),
            data: encode_payload(data, self.config.compress_payloads),
            timestamp,
        };
        Ok(serde_json::to_value(document)?)
    }
}

fn decode_document(id: &str, source: Value) -> NodeStoreResult<Vec<u8>> {
    let document: NodeDocument = serde_json::from_value(source)?;
    if document.id != id {
        return Err(NodeStoreError::CorruptResponse(format!(
            "requested node {id:?} but got {:?}",
            document.id
        )));
    }
    decode_payload(&document.data)
}

/// One failed request, reported against every batch item it covered
fn shared_failure(request: &'static str, err: ClientError) -> impl Fn() -> NodeStoreError {
    let source = Arc::new(err);
    move || match source.as_ref() {
        ClientError::InvalidResponse(message) => NodeStoreError::CorruptResponse(message.clone()),
        _ => NodeStoreError::BatchRequest {
            request,
            source: Arc::clone(&source),
        },
    }
}

fn rejected(result: BulkItemResult) -> NodeStoreError {
    NodeStoreError::Backend(ClientError::Api {
        status: result.status,
        message: result
            .error
            .unwrap_or_else(|| format!("item rejected with status {}", result.status)),
    })
}

fn check_len(request: &str, got: usize, expected: usize) -> NodeStoreResult<()> {
    if got == expected {
        Ok(())
    } else {
        Err(NodeStoreError::CorruptResponse(format!(
            "{request} returned {got} results for {expected} items"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedStore;
    use crate::client::MemoryStore;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    /// A bootstrapped store over a fault-injecting memory store
    async fn create_test_store() -> (NodeStore, ScriptedStore) {
        let scripted = ScriptedStore::new(MemoryStore::new());
        let store = NodeStore::new(Arc::new(scripted.clone()), NodeStoreConfig::default());
        store.bootstrap().await.unwrap();
        (store, scripted)
    }

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_then_write() {
        let (store, scripted) = create_test_store().await;

        assert_eq!(store.bootstrap().await.unwrap(), TemplateStatus::Created);
        assert_eq!(store.bootstrap().await.unwrap(), TemplateStatus::Created);
        assert_eq!(scripted.calls("put_index_template"), 1);

        store.set("evt-1", b"{}", Some(jan(5))).await.unwrap();
        assert_eq!(
            scripted.inner().index_names().await,
            vec!["sentry-2024.01.05"]
        );
    }

    #[tokio::test]
    async fn test_set_get_roundtrip_with_timestamp() {
        let (store, _) = create_test_store().await;
        let payload = br#"{"message": "hello world"}"#;

        store.set("event_12345", payload, Some(jan(5))).await.unwrap();

        assert_eq!(
            store.get("event_12345", Some(jan(5))).await.unwrap().as_deref(),
            Some(&payload[..])
        );
        // Any time on the same day resolves to the same bucket
        let same_day = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap();
        assert!(store.get("event_12345", Some(same_day)).await.unwrap().is_some());
        assert!(store.get("event_12345", Some(jan(6))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_document_shape() {
        let (store, scripted) = create_test_store().await;
        store.set("evt-1", b"payload", Some(jan(5))).await.unwrap();

        let source = scripted
            .inner()
            .get_document("sentry-2024.01.05", "evt-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source["id"], "evt-1");
        assert_eq!(source["timestamp"], "2024-01-05T12:00:00Z");
        assert_eq!(decode_payload(source["data"].as_str().unwrap()).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_set_get_delete_without_timestamp() {
        let (store, _) = create_test_store().await;
        let payload = br#"{"a":1}"#;

        store.set("evt-1", payload, None).await.unwrap();
        assert_eq!(
            store.get("evt-1", None).await.unwrap().as_deref(),
            Some(&payload[..])
        );

        store.delete("evt-1", None).await.unwrap();
        assert_eq!(store.get("evt-1", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (store, _) = create_test_store().await;
        assert_eq!(store.get("never-written", None).await.unwrap(), None);
        assert_eq!(store.get("never-written", Some(jan(1))).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let (store, _) = create_test_store().await;
        store.delete("never-written", None).await.unwrap();
        store.delete("never-written", Some(jan(1))).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_without_timestamp_finds_older_bucket() {
        let (store, scripted) = create_test_store().await;
        let written = Utc::now() - Duration::days(3);
        store.set("old", b"from three days ago", Some(written)).await.unwrap();

        assert_eq!(
            store.get("old", None).await.unwrap().as_deref(),
            Some(&b"from three days ago"[..])
        );
        assert_eq!(scripted.calls("search_ids"), 1);
    }

    #[tokio::test]
    async fn test_without_fallback_reads_only_todays_bucket() {
        let scripted = ScriptedStore::new(MemoryStore::new());
        let config = NodeStoreConfig {
            search_fallback: false,
            ..NodeStoreConfig::default()
        };
        let store = NodeStore::new(Arc::new(scripted.clone()), config);
        store
            .set("old", b"x", Some(Utc::now() - Duration::days(3)))
            .await
            .unwrap();

        assert_eq!(store.get("old", None).await.unwrap(), None);
        assert_eq!(scripted.calls("search_ids"), 0);

        store.delete("old", None).await.unwrap();
        assert_eq!(scripted.calls("delete_by_ids"), 0);
        assert_eq!(scripted.calls("delete_document"), 1);
    }

    #[tokio::test]
    async fn test_delete_with_timestamp_targets_one_bucket() {
        let (store, scripted) = create_test_store().await;
        store.set("evt-1", b"x", Some(jan(5))).await.unwrap();

        store.delete("evt-1", Some(jan(5))).await.unwrap();

        assert_eq!(scripted.calls("delete_document"), 1);
        assert_eq!(scripted.calls("delete_by_ids"), 0);
        assert_eq!(store.get("evt-1", Some(jan(5))).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_uncompressed_payloads() {
        let scripted = ScriptedStore::new(MemoryStore::new());
        let config = NodeStoreConfig {
            compress_payloads: false,
            ..NodeStoreConfig::default()
        };
        let store = NodeStore::new(Arc::new(scripted), config);

        store.set("evt-1", b"plain", Some(jan(5))).await.unwrap();
        assert_eq!(
            store.get("evt-1", Some(jan(5))).await.unwrap().as_deref(),
            Some(&b"plain"[..])
        );
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let (store, scripted) = create_test_store().await;

        scripted.fail_next("index_document");
        let err = store.set("evt-1", b"x", None).await.unwrap_err();
        assert!(matches!(err, NodeStoreError::Backend(ClientError::Api { status: 503, .. })));

        scripted.fail_next("get_document");
        assert!(store.get("evt-1", None).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_document_is_corrupt() {
        let (store, scripted) = create_test_store().await;
        scripted
            .inner()
            .index_document("sentry-2024.01.05", "evt-1", &json!({ "unexpected": true }))
            .await
            .unwrap();
        scripted
            .inner()
            .index_document(
                "sentry-2024.01.05",
                "evt-2",
                &json!({ "id": "evt-2", "data": "%%%", "timestamp": "2024-01-05T00:00:00Z" }),
            )
            .await
            .unwrap();

        let err = store.get("evt-1", Some(jan(5))).await.unwrap_err();
        assert!(matches!(err, NodeStoreError::CorruptResponse(_)));
        let err = store.get("evt-2", Some(jan(5))).await.unwrap_err();
        assert!(matches!(err, NodeStoreError::CorruptResponse(_)));
    }

    #[tokio::test]
    async fn test_set_multi_partial_failure() {
        let (store, scripted) = create_test_store().await;
        scripted.reject_id("b");

        let outcome = store
            .set_multi(&[
                NodeWrite::new("a", b"1".to_vec()),
                NodeWrite::new("b", b"2".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded_ids(), vec!["a"]);
        assert_eq!(outcome.failed_ids(), vec!["b"]);
        assert!(matches!(
            outcome.failed[0].error,
            NodeStoreError::Backend(ClientError::Api { status: 400, .. })
        ));
        assert_eq!(store.get("a", None).await.unwrap().as_deref(), Some(&b"1"[..]));
        assert_eq!(scripted.calls("bulk"), 1);
    }

    #[tokio::test]
    async fn test_set_multi_spreads_across_buckets() {
        let (store, scripted) = create_test_store().await;

        let outcome = store
            .set_multi(&[
                NodeWrite::new("a", b"1".to_vec()).at(jan(1)),
                NodeWrite::new("b", b"2".to_vec()).at(jan(2)),
            ])
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(
            scripted.inner().index_names().await,
            vec!["sentry-2024.01.01", "sentry-2024.01.02"]
        );
    }

    #[tokio::test]
    async fn test_set_multi_request_failure_is_an_error() {
        let (store, scripted) = create_test_store().await;
        scripted.fail_next("bulk");

        let err = store
            .set_multi(&[NodeWrite::new("a", b"1".to_vec())])
            .await
            .unwrap_err();
        assert!(matches!(err, NodeStoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_empty_batches_issue_no_requests() {
        let (store, scripted) = create_test_store().await;

        assert!(store.set_multi(&[]).await.unwrap().succeeded.is_empty());
        assert!(store.get_multi(&[]).await.unwrap().succeeded.is_empty());
        assert!(store.delete_multi(&[]).await.unwrap().succeeded.is_empty());

        assert_eq!(scripted.calls("bulk"), 0);
        assert_eq!(scripted.calls("multi_get"), 0);
        assert_eq!(scripted.calls("delete_by_ids"), 0);
    }

    #[tokio::test]
    async fn test_get_multi_mixed_results() {
        let (store, scripted) = create_test_store().await;
        store.set("today", b"t", None).await.unwrap();
        store.set("dated", b"d", Some(jan(5))).await.unwrap();
        store
            .set("older", b"o", Some(Utc::now() - Duration::days(2)))
            .await
            .unwrap();
        store.set("broken", b"x", Some(jan(5))).await.unwrap();
        scripted.reject_id("broken");

        let outcome = store
            .get_multi(&[
                NodeKey::new("today"),
                NodeKey::new("dated").at(jan(5)),
                NodeKey::new("older"),
                NodeKey::new("missing"),
                NodeKey::new("broken").at(jan(5)),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.get("today"), Some(&Some(b"t".to_vec())));
        assert_eq!(outcome.get("dated"), Some(&Some(b"d".to_vec())));
        assert_eq!(outcome.get("older"), Some(&Some(b"o".to_vec())));
        assert_eq!(outcome.get("missing"), Some(&None));
        assert_eq!(outcome.succeeded_ids(), vec!["today", "dated", "older", "missing"]);
        assert_eq!(outcome.failed_ids(), vec!["broken"]);
        assert_eq!(scripted.calls("multi_get"), 1);
        assert_eq!(scripted.calls("search_ids"), 1);
    }

    #[tokio::test]
    async fn test_delete_multi() {
        let (store, scripted) = create_test_store().await;
        store.set("id1", b"1", Some(jan(5))).await.unwrap();
        store.set("id2", b"2", Some(jan(6))).await.unwrap();
        store.set("id3", b"3", Some(jan(7))).await.unwrap();

        let outcome = store
            .delete_multi(&[
                NodeKey::new("id1").at(jan(5)),
                NodeKey::new("never-written").at(jan(5)),
                NodeKey::new("id2"),
            ])
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded.len(), 3);
        assert_eq!(store.get("id1", Some(jan(5))).await.unwrap(), None);
        assert_eq!(store.get("id2", None).await.unwrap(), None);
        assert!(store.get("id3", Some(jan(7))).await.unwrap().is_some());
        assert_eq!(scripted.calls("bulk"), 1);
        assert_eq!(scripted.calls("delete_by_ids"), 1);
    }

    #[tokio::test]
    async fn test_delete_multi_partial_failure() {
        let (store, scripted) = create_test_store().await;
        store.set("a", b"1", Some(jan(5))).await.unwrap();
        store.set("b", b"2", Some(jan(5))).await.unwrap();
        scripted.reject_id("b");

        let outcome = store
            .delete_multi(&[NodeKey::new("a").at(jan(5)), NodeKey::new("b").at(jan(5))])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded_ids(), vec!["a"]);
        assert_eq!(outcome.failed_ids(), vec!["b"]);
        assert!(store.get("b", Some(jan(5))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_through_store() {
        let (store, scripted) = create_test_store().await;
        for day in [1, 5, 10] {
            store.set(&format!("evt-{day}"), b"x", Some(jan(day))).await.unwrap();
        }

        let cutoff = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let report = store.cleanup(cutoff).await.unwrap();

        assert_eq!(report.deleted, vec!["sentry-2024.01.01", "sentry-2024.01.05"]);
        assert!(report.failed.is_empty());
        assert_eq!(scripted.inner().index_names().await, vec!["sentry-2024.01.10"]);
        assert!(store.get("evt-10", Some(jan(10))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_newest_hit_prefers_latest_bucket() {
        let (store, _) = create_test_store().await;
        let hit = |index: &str, id: &str| FetchedDocument {
            index: index.to_string(),
            id: id.to_string(),
            source: json!({}),
        };
        let hits = vec![
            hit("sentry-2024.01.01", "a"),
            hit("sentry-2024.01.09", "a"),
            hit("sentry-archive", "a"),
            hit("sentry-integ-2024.01.10", "a"),
            hit("sentry-2024.01.10", "b"),
        ];

        assert_eq!(
            store.newest_hit(hits.clone(), "a").unwrap().index,
            "sentry-2024.01.09"
        );
        assert!(store.newest_hit(hits, "c").is_none());
    }

    #[tokio::test]
    async fn test_stores_with_overlapping_prefixes_stay_apart() {
        let shared = MemoryStore::new();
        let ours = NodeStore::new(Arc::new(shared.clone()), NodeStoreConfig::default());
        let theirs = NodeStore::new(
            Arc::new(shared.clone()),
            NodeStoreConfig::new("sentry-integ"),
        );
        ours.bootstrap().await.unwrap();
        theirs.bootstrap().await.unwrap();

        let written = Utc::now() - Duration::days(3);
        ours.set("evt", b"ours", Some(written)).await.unwrap();
        theirs.set("evt", b"theirs", Some(written)).await.unwrap();
        // Not a bucket, and not a node document either
        shared.create_index("sentry-archive").await;
        shared
            .index_document("sentry-archive", "evt", &json!({ "archived": true }))
            .await
            .unwrap();

        assert_eq!(ours.get("evt", None).await.unwrap().as_deref(), Some(&b"ours"[..]));
        assert_eq!(
            theirs.get("evt", None).await.unwrap().as_deref(),
            Some(&b"theirs"[..])
        );

        ours.delete("evt", None).await.unwrap();

        assert_eq!(ours.get("evt", None).await.unwrap(), None);
        assert_eq!(
            theirs.get("evt", None).await.unwrap().as_deref(),
            Some(&b"theirs"[..])
        );
        assert_eq!(shared.document_count("sentry-archive").await, 1);

        let outcome = ours.delete_multi(&[NodeKey::new("evt")]).await.unwrap();
        assert!(outcome.is_complete());
        assert!(theirs.get("evt", None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_right_after_write_without_timestamp() {
        let (store, scripted) = create_test_store().await;
        scripted.defer_refresh();

        store.set("evt-1", b"{}", None).await.unwrap();
        store.delete("evt-1", None).await.unwrap();
        assert_eq!(store.get("evt-1", None).await.unwrap(), None);

        store.set("evt-2", b"{}", None).await.unwrap();
        let outcome = store.delete_multi(&[NodeKey::new("evt-2")]).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(store.get("evt-2", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_without_timestamp_reaches_older_buckets() {
        let (store, scripted) = create_test_store().await;
        let written = Utc::now() - Duration::days(2);
        store.set("old", b"x", Some(written)).await.unwrap();

        store.delete("old", None).await.unwrap();

        assert_eq!(store.get("old", Some(written)).await.unwrap(), None);
        assert_eq!(scripted.calls("delete_document"), 1);
        assert_eq!(scripted.calls("delete_by_ids"), 1);
    }

    #[tokio::test]
    async fn test_delete_multi_keeps_bulk_results_when_query_fails() {
        let (store, scripted) = create_test_store().await;
        store.set("a", b"1", Some(jan(5))).await.unwrap();
        store.set("b", b"2", Some(jan(6))).await.unwrap();
        scripted.fail_next("delete_by_ids");

        let outcome = store
            .delete_multi(&[NodeKey::new("a").at(jan(5)), NodeKey::new("b")])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded_ids(), vec!["a"]);
        assert_eq!(outcome.failed_ids(), vec!["b"]);
        assert!(matches!(
            outcome.failed[0].error,
            NodeStoreError::BatchRequest { request: "delete by query", .. }
        ));
        assert_eq!(store.get("a", Some(jan(5))).await.unwrap(), None);
        assert!(store.get("b", Some(jan(6))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_multi_keeps_fetched_results_when_search_fails() {
        let (store, scripted) = create_test_store().await;
        store.set("dated", b"d", Some(jan(5))).await.unwrap();
        scripted.fail_next("search_ids");

        let outcome = store
            .get_multi(&[
                NodeKey::new("dated").at(jan(5)),
                NodeKey::new("x"),
                NodeKey::new("y"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.get("dated"), Some(&Some(b"d".to_vec())));
        assert_eq!(outcome.failed_ids(), vec!["x", "y"]);
        assert!(outcome
            .failed
            .iter()
            .all(|f| matches!(f.error, NodeStoreError::BatchRequest { request: "search", .. })));
    }
}
