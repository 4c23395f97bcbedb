use super::{DocumentStore, StoredDoc, published_at_of};
use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Collection = BTreeMap<String, Value>;

/// Process-local store. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<BTreeMap<(String, String), Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one category's documents, ordered by id.
    pub async fn documents(&self, namespace: &str, category: &str) -> Vec<(String, Value)> {
        let collections = self.collections.read().await;
        collections
            .get(&(namespace.to_string(), category.to_string()))
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    async fn list(&self, namespace: &str, category: &str) -> Result<Vec<StoredDoc>> {
        Ok(self
            .documents(namespace, category)
            .await
            .into_iter()
            .map(|(id, doc)| StoredDoc {
                published_at: published_at_of(&doc),
                id,
            })
            .collect())
    }

    async fn set(&self, namespace: &str, category: &str, id: &str, doc: &Value) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry((namespace.to_string(), category.to_string()))
            .or_default()
            .insert(id.to_string(), doc.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, category: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(&(namespace.to_string(), category.to_string())) {
            collection.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_list_delete() {
        let store = MemoryStore::new();
        store
            .set("tamil", "cinema", "a", &json!({ "publishedAt": "2025-10-06T09:00:00Z" }))
            .await
            .unwrap();
        store.set("tamil", "cinema", "b", &json!({})).await.unwrap();
        store.set("tamil", "sports", "c", &json!({})).await.unwrap();

        let docs = store.list("tamil", "cinema").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].published_at.is_some());
        assert!(docs[1].published_at.is_none());

        store.delete("tamil", "cinema", "a").await.unwrap();
        store.delete("tamil", "missing", "x").await.unwrap();
        let ids: Vec<_> = store
            .list("tamil", "cinema")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(store.list("tamil", "sports").await.unwrap().len(), 1);
    }
}
