//! Retention cleanup of bucket indices
//!
//! Deletes whole daily indices whose bucket day is strictly before the
//! cutoff's UTC day. Only names that parse as one of our buckets are ever
//! deleted; anything else matching the pattern is reported as skipped.

use crate::client::DocumentStore;
use crate::index::namer::IndexNamer;
use crate::storage::error::{NodeStoreError, NodeStoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// What a cleanup run did
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Indices deleted, in bucket order
    pub deleted: Vec<String>,
    /// Indices whose deletion failed, with the cause
    pub failed: Vec<(String, NodeStoreError)>,
    /// Indices matching the pattern that are not recognisable buckets
    pub skipped: Vec<String>,
}

impl CleanupReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_indices(&self) -> Vec<&str> {
        self.failed.iter().map(|(index, _)| index.as_str()).collect()
    }
}

/// Stale indices and foreign names, as found by one listing
#[derive(Debug, Default, PartialEq, Eq)]
struct Classified {
    stale: Vec<String>,
    foreign: Vec<String>,
}

/// Finds and deletes bucket indices older than a cutoff
pub struct IndexCleaner {
    store: Arc<dyn DocumentStore>,
    namer: IndexNamer,
}

impl IndexCleaner {
    pub fn new(store: Arc<dyn DocumentStore>, namer: IndexNamer) -> Self {
        Self { store, namer }
    }

    /// Indices `cleanup` would delete for this cutoff, without deleting anything
    pub async fn candidates(&self, cutoff: DateTime<Utc>) -> NodeStoreResult<Vec<String>> {
        Ok(self.scan(cutoff).await?.stale)
    }

    /// Delete every bucket index strictly older than the cutoff's day.
    ///
    /// Listing failures are returned as errors. Each deletion is attempted
    /// independently and reported in the result.
    pub async fn cleanup(&self, cutoff: DateTime<Utc>) -> NodeStoreResult<CleanupReport> {
        let Classified { stale, foreign } = self.scan(cutoff).await?;

        let mut report = CleanupReport {
            skipped: foreign,
            ..Default::default()
        };

        for index in stale {
            match self.store.delete_index(&index).await {
                Ok(()) => {
                    tracing::info!(index = %index, "Deleted expired index");
                    report.deleted.push(index);
                }
                Err(e) => {
                    tracing::warn!(index = %index, error = %e, "Failed to delete expired index");
                    report.failed.push((index, e.into()));
                }
            }
        }

        tracing::info!(
            cutoff = %cutoff.date_naive(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Index cleanup finished"
        );
        Ok(report)
    }

    async fn scan(&self, cutoff: DateTime<Utc>) -> NodeStoreResult<Classified> {
        let indices = self.store.list_indices(&self.namer.pattern()).await?;
        Ok(self.classify(indices, cutoff.date_naive()))
    }

    fn classify(&self, indices: Vec<String>, cutoff_day: NaiveDate) -> Classified {
        let mut buckets = Vec::new();
        let mut foreign = Vec::new();

        for index in indices {
            match self.namer.parse_bucket(&index) {
                Some(day) => buckets.push((day, index)),
                None => {
                    tracing::warn!(index = %index, "Skipping index that is not a date bucket");
                    foreign.push(index);
                }
            }
        }

        buckets.sort();
        foreign.sort();
        Classified {
            stale: buckets
                .into_iter()
                .filter(|(day, _)| *day < cutoff_day)
                .map(|(_, index)| index)
                .collect(),
            foreign,
        }
    }
}
