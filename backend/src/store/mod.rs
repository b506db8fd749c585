//! Document persistence
//!
//! Every entity kind lives in its own logical collection of JSON documents.
//! A document may carry a natural key (e.g. `2025-09` for a monthly plan);
//! keys are unique per collection and back the idempotent lookup-or-create
//! used by the plan cascade.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{AppError, AppResult};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{collection}/{id} already exists")]
    DuplicateId { collection: String, id: String },

    #[error("{collection} key '{key}' already exists")]
    DuplicateKey { collection: String, key: String },

    #[error("{collection}/{id} does not exist")]
    Missing { collection: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Top-level field equality filter
#[derive(Debug, Clone, Default)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// One write of an atomic batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert {
        collection: &'static str,
        id: String,
        key: Option<String>,
        doc: Value,
    },
    Replace {
        collection: &'static str,
        id: String,
        doc: Value,
    },
    Delete {
        collection: &'static str,
        id: String,
    },
}

/// Outcome of a lookup-or-create
#[derive(Debug, Clone)]
pub struct Inserted {
    pub doc: Value,
    pub created: bool,
}

/// Storage backend. Single operations are atomic; `insert_unique` is an
/// atomic lookup-or-create and `apply` commits all or nothing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        key: Option<&str>,
        doc: Value,
    ) -> StoreResult<()>;

    /// Insert under `key` unless a document already holds it, in which case
    /// that document is returned untouched.
    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        id: &str,
        doc: Value,
    ) -> StoreResult<Inserted>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    async fn get_by_key(&self, collection: &str, key: &str) -> StoreResult<Option<Value>>;

    /// Matching documents in insertion order
    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> StoreResult<bool>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    async fn clear(&self, collection: &str) -> StoreResult<u64>;

    async fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;
}

/// An entity persisted as a JSON document
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    /// Human label used in error messages
    const LABEL: &'static str;

    fn id(&self) -> &str;

    fn natural_key(&self) -> Option<String> {
        None
    }
}

/// Typed view over one collection
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn insert(&self, doc: &T) -> StoreResult<()> {
        let key = doc.natural_key();
        self.store
            .insert(T::COLLECTION, doc.id(), key.as_deref(), serde_json::to_value(doc)?)
            .await
    }

    /// Lookup-or-create on the document's natural key. Returns the stored
    /// document and whether this call created it.
    pub async fn insert_unique(&self, doc: &T) -> StoreResult<(T, bool)> {
        let Some(key) = doc.natural_key() else {
            self.insert(doc).await?;
            return Ok((doc.clone(), true));
        };
        let inserted = self
            .store
            .insert_unique(T::COLLECTION, &key, doc.id(), serde_json::to_value(doc)?)
            .await?;
        Ok((serde_json::from_value(inserted.doc)?, inserted.created))
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Like `get`, but a missing document is a `NotFound` error
    pub async fn require(&self, id: &str) -> AppResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(T::LABEL.to_string()))
    }

    pub async fn get_by_key(&self, key: &str) -> StoreResult<Option<T>> {
        self.store
            .get_by_key(T::COLLECTION, key)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    pub async fn find(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn all(&self) -> StoreResult<Vec<T>> {
        self.find(&Filter::new()).await
    }

    pub async fn replace(&self, doc: &T) -> StoreResult<bool> {
        self.store
            .replace(T::COLLECTION, doc.id(), serde_json::to_value(doc)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn clear(&self) -> StoreResult<u64> {
        self.store.clear(T::COLLECTION).await
    }

    pub fn insert_op(doc: &T) -> StoreResult<WriteOp> {
        Ok(WriteOp::Insert {
            collection: T::COLLECTION,
            id: doc.id().to_string(),
            key: doc.natural_key(),
            doc: serde_json::to_value(doc)?,
        })
    }

    pub fn replace_op(doc: &T) -> StoreResult<WriteOp> {
        Ok(WriteOp::Replace {
            collection: T::COLLECTION,
            id: doc.id().to_string(),
            doc: serde_json::to_value(doc)?,
        })
    }

    pub fn delete_op(id: &str) -> WriteOp {
        WriteOp::Delete {
            collection: T::COLLECTION,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_top_level_fields() {
        let doc = json!({"weeklyPlanId": "w1", "dayNumber": 3, "status": "pending"});
        assert!(Filter::new().matches(&doc));
        assert!(Filter::new().eq("weeklyPlanId", "w1").eq("dayNumber", 3).matches(&doc));
        assert!(!Filter::new().eq("weeklyPlanId", "w2").matches(&doc));
        assert!(!Filter::new().eq("missing", "x").matches(&doc));
    }
}
