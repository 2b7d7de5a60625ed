//! Index lifecycle
//!
//! Records live in daily indices named `<prefix>-YYYY.MM.DD`:
//!
//! - **namer**: timestamp → index name, and back
//! - **template**: the index template every daily index inherits
//! - **cleanup**: retention by deleting whole expired indices
//!
//! # Lifecycle
//!
//! ```text
//! bootstrap:  ensure_template ─► template (shards, replicas, codec, mappings)
//! write:      name_for(ts) ─► index created on first write of the day
//! retention:  list <prefix>-* ─► parse bucket ─► delete if day < cutoff day
//! ```

pub mod cleanup;
pub mod namer;
pub mod template;

pub use cleanup::{CleanupReport, IndexCleaner};
pub use namer::IndexNamer;
pub use template::{build_template, TemplateManager, TemplateStatus};
