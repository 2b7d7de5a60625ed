//! Daily bucket index names
//!
//! Writes and cleanup agree on bucket boundaries only through this module:
//! an index name is always recomputed from a timestamp, never stored.

use chrono::{DateTime, NaiveDate, Utc};

/// Date format of the bucket suffix
const BUCKET_FORMAT: &str = "%Y.%m.%d";

/// Maps timestamps to `<prefix>-YYYY.MM.DD` index names (UTC days)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNamer {
    prefix: String,
}

impl IndexNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Glob matching every name this namer can produce
    pub fn pattern(&self) -> String {
        format!("{}-*", self.prefix)
    }

    /// Index for the given instant, or for now when `None`
    pub fn name_for(&self, timestamp: Option<DateTime<Utc>>) -> String {
        let timestamp = timestamp.unwrap_or_else(Utc::now);
        self.name_for_date(timestamp.date_naive())
    }

    pub fn name_for_date(&self, date: NaiveDate) -> String {
        format!("{}-{}", self.prefix, date.format(BUCKET_FORMAT))
    }

    /// Recover the bucket day from an index name.
    ///
    /// Returns `None` unless the name is exactly what [`name_for_date`](Self::name_for_date)
    /// would produce for some day, so foreign indices sharing the prefix are never claimed.
    pub fn parse_bucket(&self, index: &str) -> Option<NaiveDate> {
        let suffix = index.strip_prefix(&self.prefix)?.strip_prefix('-')?;
        let date = NaiveDate::parse_from_str(suffix, BUCKET_FORMAT).ok()?;

        // Rejects unpadded or otherwise non-canonical spellings
        if date.format(BUCKET_FORMAT).to_string() == suffix {
            Some(date)
        } else {
            None
        }
    }
}

impl Default for IndexNamer {
    fn default() -> Self {
        Self::new("sentry")
    }
}
