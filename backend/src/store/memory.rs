//! In-process document store for development and tests

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, Filter, Inserted, StoreError, StoreResult, WriteOp};

#[derive(Debug, Clone)]
struct Stored {
    id: String,
    key: Option<String>,
    doc: Value,
}

type Collections = HashMap<String, Vec<Stored>>;

/// Collections held behind one lock; batches stage on a copy and swap in.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_into(
    collections: &mut Collections,
    collection: &str,
    id: &str,
    key: Option<&str>,
    doc: Value,
) -> StoreResult<()> {
    let docs = collections.entry(collection.to_string()).or_default();
    if docs.iter().any(|d| d.id == id) {
        return Err(StoreError::DuplicateId {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
    if let Some(key) = key {
        if docs.iter().any(|d| d.key.as_deref() == Some(key)) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }
    }
    docs.push(Stored {
        id: id.to_string(),
        key: key.map(str::to_string),
        doc,
    });
    Ok(())
}

fn replace_in(collections: &mut Collections, collection: &str, id: &str, doc: Value) -> bool {
    match collections
        .get_mut(collection)
        .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
    {
        Some(stored) => {
            stored.doc = doc;
            true
        }
        None => false,
    }
}

fn delete_from(collections: &mut Collections, collection: &str, id: &str) -> bool {
    let Some(docs) = collections.get_mut(collection) else {
        return false;
    };
    let before = docs.len();
    docs.retain(|d| d.id != id);
    docs.len() != before
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        key: Option<&str>,
        doc: Value,
    ) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        insert_into(&mut collections, collection, id, key, doc)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        id: &str,
        doc: Value,
    ) -> StoreResult<Inserted> {
        let mut collections = self.collections.write().await;
        let existing = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.key.as_deref() == Some(key)));
        if let Some(existing) = existing {
            return Ok(Inserted {
                doc: existing.doc.clone(),
                created: false,
            });
        }
        insert_into(&mut collections, collection, id, Some(key), doc.clone())?;
        Ok(Inserted { doc, created: true })
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| d.doc.clone()))
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.key.as_deref() == Some(key)))
            .map(|d| d.doc.clone()))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.doc))
                    .map(|d| d.doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(replace_in(&mut collections, collection, id, doc))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(delete_from(&mut collections, collection, id))
    }

    async fn clear(&self, collection: &str) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .remove(collection)
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let mut staged = collections.clone();

        for op in ops {
            match op {
                WriteOp::Insert {
                    collection,
                    id,
                    key,
                    doc,
                } => insert_into(&mut staged, collection, &id, key.as_deref(), doc)?,
                WriteOp::Replace {
                    collection,
                    id,
                    doc,
                } => {
                    if !replace_in(&mut staged, collection, &id, doc) {
                        return Err(StoreError::Missing {
                            collection: collection.to_string(),
                            id,
                        });
                    }
                }
                WriteOp::Delete { collection, id } => {
                    delete_from(&mut staged, collection, &id);
                }
            }
        }

        *collections = staged;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_unique_returns_existing() {
        let store = MemoryStore::new();
        let first = store
            .insert_unique("plans", "2025-09", "a", json!({"id": "a"}))
            .await
            .unwrap();
        let second = store
            .insert_unique("plans", "2025-09", "b", json!({"id": "b"}))
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.doc["id"], "a");
        assert_eq!(store.find("plans", &Filter::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.insert("plans", "a", None, json!({"v": 1})).await.unwrap();

        let result = store
            .apply(vec![
                WriteOp::Replace {
                    collection: "plans",
                    id: "a".into(),
                    doc: json!({"v": 2}),
                },
                WriteOp::Replace {
                    collection: "plans",
                    id: "missing".into(),
                    doc: json!({}),
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::Missing { .. })));
        assert_eq!(store.get("plans", "a").await.unwrap(), Some(json!({"v": 1})));
    }

    #[tokio::test]
    async fn test_duplicate_key_insert_rejected() {
        let store = MemoryStore::new();
        store.insert("roles", "1", Some("admin"), json!({})).await.unwrap();
        let err = store.insert("roles", "2", Some("admin"), json!({})).await;
        assert!(matches!(err, Err(StoreError::DuplicateKey { .. })));
    }
}
