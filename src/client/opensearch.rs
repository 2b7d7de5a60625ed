//! OpenSearch REST API Client
//!
//! HTTP client for the subset of the OpenSearch API the node store uses.
//! Response bodies are parsed into the typed values of the client contract;
//! anything that does not have the expected shape becomes
//! [`ClientError::InvalidResponse`].

use super::{
    BulkItemResult, BulkOperation, ClientError, ClientResult, DocumentRef, DocumentStore,
    FetchedDocument, MultiGetItem, TemplateWrite,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

/// Connection settings for an OpenSearch cluster
#[derive(Debug, Clone, Deserialize)]
pub struct OpenSearchConfig {
    /// Base URL of the cluster (e.g., "http://localhost:9200")
    #[serde(default = "default_url")]
    pub url: String,
    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Skip TLS certificate verification (self-signed test clusters)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            request_timeout_ms: default_request_timeout_ms(),
            accept_invalid_certs: false,
        }
    }
}

/// OpenSearch REST API client
pub struct OpenSearchClient {
    client: Client,
    config: OpenSearchConfig,
}

impl OpenSearchClient {
    /// Create a new client with the given configuration
    pub fn new(config: OpenSearchConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenSearchConfig {
        &self.config
    }

    /// Check if the cluster answers at all
    pub async fn ping(&self) -> ClientResult<()> {
        let response = self.send(self.request(Method::HEAD, "/")).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.url.trim_end_matches('/'), path);
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(user) => builder.basic_auth(user, self.config.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        builder.send().await.map_err(ClientError::from_transport)
    }

    async fn read_json(response: Response) -> ClientResult<Value> {
        let text = response.text().await.map_err(ClientError::from_transport)?;
        serde_json::from_str(&text)
            .map_err(|e| ClientError::InvalidResponse(format!("body is not JSON: {e}")))
    }

    async fn api_error(response: Response) -> ClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| error_reason(&body))
            .unwrap_or(text);
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl DocumentStore for OpenSearchClient {
    async fn index_template_exists(&self, name: &str) -> ClientResult<bool> {
        let path = format!("/_index_template/{name}");
        let response = self.send(self.request(Method::GET, &path)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn put_index_template(&self, name: &str, body: &Value) -> ClientResult<TemplateWrite> {
        let path = format!("/_index_template/{name}?create=true");
        let response = self
            .send(self.request(Method::PUT, &path).json(body))
            .await?;

        if response.status().is_success() {
            return Ok(TemplateWrite::Created);
        }

        match Self::api_error(response).await {
            ClientError::Api { status, message } if is_already_exists(status, &message) => {
                Ok(TemplateWrite::AlreadyExists)
            }
            err => Err(err),
        }
    }

    async fn index_document(&self, index: &str, id: &str, source: &Value) -> ClientResult<()> {
        let path = format!("/{index}/_doc/{}", urlencoding::encode(id));
        let response = self
            .send(self.request(Method::PUT, &path).json(source))
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn get_document(&self, index: &str, id: &str) -> ClientResult<Option<Value>> {
        let path = format!("/{index}/_doc/{}", urlencoding::encode(id));
        let response = self.send(self.request(Method::GET, &path)).await?;

        match response.status() {
            status if status.is_success() => {
                let body = Self::read_json(response).await?;
                parse_get_response(body)
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn delete_document(&self, index: &str, id: &str) -> ClientResult<bool> {
        let path = format!("/{index}/_doc/{}", urlencoding::encode(id));
        let response = self.send(self.request(Method::DELETE, &path)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn bulk(&self, operations: &[BulkOperation]) -> ClientResult<Vec<BulkItemResult>> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let body = bulk_body(operations);
        let response = self
            .send(
                self.request(Method::POST, "/_bulk")
                    .header("Content-Type", "application/x-ndjson")
                    .body(body),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body = Self::read_json(response).await?;
        parse_bulk_response(body, operations)
    }

    async fn multi_get(&self, refs: &[DocumentRef]) -> ClientResult<Vec<MultiGetItem>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let docs: Vec<Value> = refs
            .iter()
            .map(|r| json!({ "_index": r.index, "_id": r.id }))
            .collect();
        let response = self
            .send(
                self.request(Method::POST, "/_mget")
                    .json(&json!({ "docs": docs })),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body = Self::read_json(response).await?;
        parse_mget_response(body, refs)
    }

    async fn search_ids(&self, target: &str, ids: &[String]) -> ClientResult<Vec<FetchedDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("/{target}/_search?ignore_unavailable=true&allow_no_indices=true");
        let query = json!({
            "size": ids.len(),
            "query": { "ids": { "values": ids } },
        });
        let response = self
            .send(self.request(Method::POST, &path).json(&query))
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = Self::read_json(response).await?;
                parse_search_response(body)
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn delete_by_ids(&self, target: &str, ids: &[String]) -> ClientResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        // refresh=true makes the deletions visible to the next search
        let path = format!(
            "/{target}/_delete_by_query?refresh=true&conflicts=proceed&ignore_unavailable=true&allow_no_indices=true"
        );
        let query = json!({ "query": { "ids": { "values": ids } } });
        let response = self
            .send(self.request(Method::POST, &path).json(&query))
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body = Self::read_json(response).await?;
                body.get("deleted").and_then(Value::as_u64).ok_or_else(|| {
                    ClientError::InvalidResponse("delete_by_query without 'deleted'".into())
                })
            }
            StatusCode::NOT_FOUND => Ok(0),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn list_indices(&self, target: &str) -> ClientResult<Vec<String>> {
        let path = format!("/_cat/indices/{target}?format=json&h=index");
        let response = self.send(self.request(Method::GET, &path)).await?;

        match response.status() {
            status if status.is_success() => {
                let body = Self::read_json(response).await?;
                parse_cat_indices(body)
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn delete_index(&self, index: &str) -> ClientResult<()> {
        let path = format!("/{index}");
        let response = self.send(self.request(Method::DELETE, &path)).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already gone
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(Self::api_error(response).await),
        }
    }
}

// ============================================
// Request/Response helpers
// ============================================

fn error_reason(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if let Some(reason) = error.get("reason").and_then(Value::as_str) {
        let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
        return Some(format!("{kind}: {reason}"));
    }
    error.as_str().map(str::to_string)
}

fn is_already_exists(status: u16, message: &str) -> bool {
    status == 400
        && (message.contains("resource_already_exists_exception")
            || message.contains("already exists"))
}

fn bulk_body(operations: &[BulkOperation]) -> String {
    let mut body = String::new();
    for op in operations {
        match op {
            BulkOperation::Index { index, id, source } => {
                body.push_str(&json!({ "index": { "_index": index, "_id": id } }).to_string());
                body.push('\n');
                body.push_str(&source.to_string());
                body.push('\n');
            }
            BulkOperation::Delete { index, id } => {
                body.push_str(&json!({ "delete": { "_index": index, "_id": id } }).to_string());
                body.push('\n');
            }
        }
    }
    body
}

fn parse_get_response(body: Value) -> ClientResult<Option<Value>> {
    if body.get("found").and_then(Value::as_bool) == Some(false) {
        return Ok(None);
    }
    match body.get("_source") {
        Some(source) if source.is_object() => Ok(Some(source.clone())),
        _ => Err(ClientError::InvalidResponse(
            "document response without '_source'".into(),
        )),
    }
}

fn parse_bulk_response(body: Value, operations: &[BulkOperation]) -> ClientResult<Vec<BulkItemResult>> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::InvalidResponse("bulk response without 'items'".into()))?;

    if items.len() != operations.len() {
        return Err(ClientError::InvalidResponse(format!(
            "bulk response has {} items for {} operations",
            items.len(),
            operations.len()
        )));
    }

    items
        .iter()
        .zip(operations)
        .map(|(item, op)| {
            // Each item is keyed by its action: {"index": {...}} or {"delete": {...}}
            let result = item
                .as_object()
                .and_then(|obj| obj.values().next())
                .ok_or_else(|| ClientError::InvalidResponse("empty bulk item".into()))?;
            let status = result
                .get("status")
                .and_then(Value::as_u64)
                .ok_or_else(|| ClientError::InvalidResponse("bulk item without 'status'".into()))?;
            let status = u16::try_from(status).map_err(|_| {
                ClientError::InvalidResponse(format!("bulk item status {status} out of range"))
            })?;

            Ok(BulkItemResult {
                index: op.index().to_string(),
                id: op.id().to_string(),
                status,
                error: error_reason(result),
            })
        })
        .collect()
}

fn parse_mget_response(body: Value, refs: &[DocumentRef]) -> ClientResult<Vec<MultiGetItem>> {
    let docs = body
        .get("docs")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::InvalidResponse("mget response without 'docs'".into()))?;

    if docs.len() != refs.len() {
        return Err(ClientError::InvalidResponse(format!(
            "mget response has {} docs for {} requests",
            docs.len(),
            refs.len()
        )));
    }

    Ok(docs
        .iter()
        .zip(refs)
        .map(|(doc, r)| {
            let outcome = if let Some(message) = error_reason(doc) {
                if message.starts_with("index_not_found_exception") {
                    Ok(None)
                } else {
                    Err(ClientError::Api {
                        status: 500,
                        message,
                    })
                }
            } else {
                parse_get_response(doc.clone())
            };
            MultiGetItem {
                index: r.index.clone(),
                id: r.id.clone(),
                outcome,
            }
        })
        .collect())
}

fn parse_search_response(body: Value) -> ClientResult<Vec<FetchedDocument>> {
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::InvalidResponse("search response without 'hits'".into()))?;

    hits.iter()
        .map(|hit| {
            let field = |name: &str| {
                hit.get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ClientError::InvalidResponse(format!("search hit without '{name}'")))
            };
            Ok(FetchedDocument {
                index: field("_index")?,
                id: field("_id")?,
                source: hit
                    .get("_source")
                    .cloned()
                    .ok_or_else(|| ClientError::InvalidResponse("search hit without '_source'".into()))?,
            })
        })
        .collect()
}

fn parse_cat_indices(body: Value) -> ClientResult<Vec<String>> {
    let rows = body
        .as_array()
        .ok_or_else(|| ClientError::InvalidResponse("cat indices is not an array".into()))?;

    rows.iter()
        .map(|row| {
            row.get("index")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ClientError::InvalidResponse("cat indices row without 'index'".into()))
        })
        .collect()
}
