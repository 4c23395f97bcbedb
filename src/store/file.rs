//! Local mirror of the remote layout.
//!
//! ```text
//! <root>/
//! └── tamil/
//!     ├── cinema.json     # { "<doc id>": { ...document... }, ... }
//!     └── tamilnadu.json
//! ```

use super::{DocumentStore, StoredDoc, published_at_of};
use crate::cache::JsonFile;
use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

type Collection = BTreeMap<String, Value>;

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    // Serializes read-modify-write cycles on the category files.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    fn collection(&self, namespace: &str, category: &str) -> JsonFile<Collection> {
        JsonFile::new(self.root.join(namespace).join(format!("{category}.json")))
    }
}

impl DocumentStore for FileStore {
    async fn list(&self, namespace: &str, category: &str) -> Result<Vec<StoredDoc>> {
        let _guard = self.lock.lock().await;
        let docs = self.collection(namespace, category).load().await;
        Ok(docs
            .iter()
            .map(|(id, doc)| StoredDoc {
                id: id.clone(),
                published_at: published_at_of(doc),
            })
            .collect())
    }

    async fn set(&self, namespace: &str, category: &str, id: &str, doc: &Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let file = self.collection(namespace, category);
        let mut docs = file.load().await;
        docs.insert(id.to_string(), doc.clone());
        file.save(&docs).await?;
        debug!(path = %file.path().display(), %id, "Stored document");
        Ok(())
    }

    async fn delete(&self, namespace: &str, category: &str, id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let file = self.collection(namespace, category);
        let mut docs = file.load().await;
        if docs.remove(id).is_some() {
            file.save(&docs).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_documents_persist_per_category() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .set("tamil", "cinema", "abc", &json!({ "title": "ஒன்று", "publishedAt": "2025-10-06T09:00:00Z" }))
            .await
            .unwrap();
        store.set("tamil", "cinema", "def", &json!({ "title": "இரண்டு" })).await.unwrap();

        let path = dir.path().join("tamil").join("cinema.json");
        let raw: Collection = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["abc"]["title"], "ஒன்று");

        let reopened = FileStore::new(dir.path());
        let docs = reopened.list("tamil", "cinema").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.id == "abc" && d.published_at.is_some()));

        reopened.delete("tamil", "cinema", "abc").await.unwrap();
        let docs = reopened.list("tamil", "cinema").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "def");
    }

    #[tokio::test]
    async fn test_missing_category_lists_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.list("tamil", "sports").await.unwrap().is_empty());
    }
}
