//! PostgreSQL document store: one `documents` table of JSONB rows

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::{DocumentStore, Filter, Inserted, StoreError, StoreResult, WriteOp};

#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(err: sqlx::Error, collection: &str, id: &str, key: Option<&str>) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            if db_err.constraint() == Some("documents_pkey") {
                StoreError::DuplicateId {
                    collection: collection.to_string(),
                    id: id.to_string(),
                }
            } else {
                StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    key: key.unwrap_or_default().to_string(),
                }
            }
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        key: Option<&str>,
        doc: Value,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, natural_key, data)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(key)
        .bind(doc)
        .execute(&self.db)
        .await
        .map_err(|e| map_insert_error(e, collection, id, key))?;

        Ok(())
    }

    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        id: &str,
        doc: Value,
    ) -> StoreResult<Inserted> {
        let created = sqlx::query_scalar::<_, Value>(
            r#"
            INSERT INTO documents (collection, id, natural_key, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, natural_key) WHERE natural_key IS NOT NULL DO NOTHING
            RETURNING data
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(key)
        .bind(&doc)
        .fetch_optional(&self.db)
        .await?;

        if let Some(doc) = created {
            return Ok(Inserted { doc, created: true });
        }

        // Lost the race (or the key was taken before): hand back the holder
        let existing = self.get_by_key(collection, key).await?.ok_or_else(|| {
            StoreError::Unavailable(format!("{} key '{}' vanished after conflict", collection, key))
        })?;
        Ok(Inserted {
            doc: existing,
            created: false,
        })
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let doc = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(doc)
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        let doc = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM documents WHERE collection = $1 AND natural_key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT data FROM documents
            WHERE collection = $1 AND data @> $2
            ORDER BY seq
            "#,
        )
        .bind(collection)
        .bind(filter.as_value())
        .fetch_all(&self.db)
        .await?;

        Ok(docs)
    }

    async fn replace(&self, collection: &str, id: &str, doc: Value) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET data = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(doc)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, collection: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1")
            .bind(collection)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;

        for op in ops {
            match op {
                WriteOp::Insert {
                    collection,
                    id,
                    key,
                    doc,
                } => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, natural_key, data)
                        VALUES ($1, $2, $3, $4)
                        "#,
                    )
                    .bind(collection)
                    .bind(&id)
                    .bind(key.as_deref())
                    .bind(doc)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_insert_error(e, collection, &id, key.as_deref()))?;
                }
                WriteOp::Replace {
                    collection,
                    id,
                    doc,
                } => {
                    let result = sqlx::query(
                        r#"
                        UPDATE documents SET data = $3, updated_at = NOW()
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                    .bind(collection)
                    .bind(&id)
                    .bind(doc)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(StoreError::Missing {
                            collection: collection.to_string(),
                            id,
                        });
                    }
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
