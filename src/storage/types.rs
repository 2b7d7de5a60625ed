//! Core data types for the node store
//!
//! - `NodeDocument`: the wire shape of one stored record
//! - `NodeWrite` / `NodeKey`: inputs to the batch operations
//! - `BatchOutcome`: per-item results of a batch operation

use crate::storage::error::NodeStoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record as stored in a bucket index. The document `_id` is the record id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDocument {
    pub id: String,
    /// Encoded payload, see [`crate::storage::codec`]
    pub data: String,
    /// Creation time; selects the bucket the document was written to
    pub timestamp: DateTime<Utc>,
}

/// A record to write in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWrite {
    pub id: String,
    pub data: Vec<u8>,
    /// Creation time; now when unset
    pub timestamp: Option<DateTime<Utc>>,
}

impl NodeWrite {
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            timestamp: None,
        }
    }

    /// Builder method: set the creation time
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A record to read or delete in a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub id: String,
    /// Creation time hint selecting the bucket
    pub timestamp: Option<DateTime<Utc>>,
}

impl NodeKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: None,
        }
    }

    /// Builder method: set the creation time hint
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl From<&str> for NodeKey {
    fn from(id: &str) -> Self {
        NodeKey::new(id)
    }
}

impl From<String> for NodeKey {
    fn from(id: String) -> Self {
        NodeKey::new(id)
    }
}

/// A batch item that failed, with its cause
#[derive(Debug)]
pub struct ItemFailure {
    pub id: String,
    pub error: NodeStoreError,
}

/// Per-item results of a batch operation.
///
/// Items are independent: a failure of one never hides the result of another.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<(String, T)>,
    pub failed: Vec<ItemFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// True when no item failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.succeeded.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    /// Result for one id, if it succeeded
    pub fn get(&self, id: &str) -> Option<&T> {
        self.succeeded
            .iter()
            .find(|(item_id, _)| item_id == id)
            .map(|(_, value)| value)
    }

    pub(crate) fn push_success(&mut self, id: impl Into<String>, value: T) {
        self.succeeded.push((id.into(), value));
    }

    pub(crate) fn push_failure(&mut self, id: impl Into<String>, error: NodeStoreError) {
        self.failed.push(ItemFailure {
            id: id.into(),
            error,
        });
    }
}
