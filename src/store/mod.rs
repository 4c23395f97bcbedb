//! Remote document stores.
//!
//! Documents live under `news/{namespace}/{category}/{id}` where `id` is the
//! lowercase hex MD5 of the article's source URL. The sync stage only needs
//! three operations per category collection, captured by [`DocumentStore`].
//!
//! # Backends
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | In-memory | [`memory`] | tests and dry runs |
//! | JSON files | [`file`] | local mirror, one file per category |
//! | Firestore | [`firestore`] | production, REST v1 |

pub mod file;
pub mod firestore;
pub mod memory;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub use file::FileStore;
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// What the sync stage needs to know about a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDoc {
    pub id: String,
    /// `None` when the stored field is missing or unparseable.
    pub published_at: Option<DateTime<Utc>>,
}

/// A category-partitioned document collection.
pub trait DocumentStore {
    async fn list(&self, namespace: &str, category: &str) -> Result<Vec<StoredDoc>>;

    /// Create or overwrite a document.
    async fn set(&self, namespace: &str, category: &str, id: &str, doc: &Value) -> Result<()>;

    async fn delete(&self, namespace: &str, category: &str, id: &str) -> Result<()>;
}

/// Stable document id for a source URL.
pub fn doc_id(source: &str) -> String {
    format!("{:x}", md5::compute(source.as_bytes()))
}

/// Read the `publishedAt` field of a JSON document.
pub(crate) fn published_at_of(doc: &Value) -> Option<DateTime<Utc>> {
    doc.get("publishedAt")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
