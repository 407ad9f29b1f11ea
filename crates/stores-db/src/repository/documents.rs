//! # Document Repository
//!
//! JSON documents grouped into named collections.
//!
//! ## Write Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert   new id only, Duplicate if taken                              │
//! │  upsert   create or replace the whole body                             │
//! │  patch    merge top-level fields into an existing body, NotFound else  │
//! │  delete   idempotent, reports whether anything was removed             │
//! │                                                                         │
//! │  apply_batch([...])                                                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. PATCH items/I1        { stock: 15 }                         │   │
//! │  │  2. UPSERT transactions/T9 { itemId: I1, type: IN, ... }        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// A document body without its id.
pub type JsonMap = Map<String, Value>;

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub data: JsonMap,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    Insert {
        collection: String,
        id: String,
        data: JsonMap,
    },
    Upsert {
        collection: String,
        id: String,
        data: JsonMap,
    },
    Patch {
        collection: String,
        id: String,
        fields: JsonMap,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl DocumentWrite {
    pub fn collection(&self) -> &str {
        match self {
            DocumentWrite::Insert { collection, .. }
            | DocumentWrite::Upsert { collection, .. }
            | DocumentWrite::Patch { collection, .. }
            | DocumentWrite::Delete { collection, .. } => collection,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: String,
}

fn decode(collection: &str, row: DocumentRow) -> DbResult<DocumentRecord> {
    match serde_json::from_str::<Value>(&row.data) {
        Ok(Value::Object(data)) => Ok(DocumentRecord { id: row.id, data }),
        Ok(other) => Err(DbError::CorruptDocument {
            collection: collection.to_string(),
            id: row.id,
            reason: format!("expected object, found {}", other),
        }),
        Err(e) => Err(DbError::CorruptDocument {
            collection: collection.to_string(),
            id: row.id,
            reason: e.to_string(),
        }),
    }
}

/// Repository for document collections.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists every document in a collection.
    ///
    /// Rows that no longer decode as JSON objects are skipped with a warning.
    pub async fn list(&self, collection: &str) -> DbResult<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            match decode(collection, row) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(collection = %collection, error = %e, "Skipping corrupt document"),
            }
        }

        debug!(collection = %collection, count = docs.len(), "Listed documents");
        Ok(docs)
    }

    /// Fetches one document.
    pub async fn get(&self, collection: &str, id: &str) -> DbResult<Option<DocumentRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch_in(&mut conn, collection, id).await
    }

    /// Counts documents in a collection.
    pub async fn count(&self, collection: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new document. Fails with `Duplicate` if the id is taken.
    pub async fn insert(&self, collection: &str, id: &str, data: &JsonMap) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, collection, id, data).await
    }

    /// Creates or fully replaces a document.
    pub async fn upsert(&self, collection: &str, id: &str, data: &JsonMap) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_in(&mut conn, collection, id, data).await
    }

    /// Merges `fields` into an existing document and returns the new body.
    pub async fn patch(&self, collection: &str, id: &str, fields: &JsonMap) -> DbResult<JsonMap> {
        let mut tx = self.pool.begin().await?;
        let merged = patch_in(&mut tx, collection, id, fields).await?;
        tx.commit().await?;
        Ok(merged)
    }

    /// Deletes a document. Returns whether it existed.
    pub async fn delete(&self, collection: &str, id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        delete_in(&mut conn, collection, id).await
    }

    /// Applies every write in one SQLite transaction.
    ///
    /// On any failure the transaction is dropped uncommitted, so none of the
    /// writes are visible.
    pub async fn apply_batch(&self, writes: &[DocumentWrite]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for write in writes {
            match write {
                DocumentWrite::Insert { collection, id, data } => {
                    insert_in(&mut tx, collection, id, data).await?
                }
                DocumentWrite::Upsert { collection, id, data } => {
                    upsert_in(&mut tx, collection, id, data).await?
                }
                DocumentWrite::Patch { collection, id, fields } => {
                    patch_in(&mut tx, collection, id, fields).await?;
                }
                DocumentWrite::Delete { collection, id } => {
                    delete_in(&mut tx, collection, id).await?;
                }
            }
        }

        tx.commit().await?;
        debug!(writes = writes.len(), "Batch committed");
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers (shared by single writes and batches)
// =============================================================================

async fn fetch_in(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
) -> DbResult<Option<DocumentRecord>> {
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, data FROM documents WHERE collection = ?1 AND id = ?2",
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| decode(collection, r)).transpose()
}

async fn insert_in(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    data: &JsonMap,
) -> DbResult<()> {
    let body = serde_json::to_string(data)?;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO documents (collection, id, data, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT (collection, id) DO NOTHING
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(body)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::duplicate(collection, id));
    }
    Ok(())
}

async fn upsert_in(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    data: &JsonMap,
) -> DbResult<()> {
    let body = serde_json::to_string(data)?;
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, data, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT (collection, id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(body)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn patch_in(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    fields: &JsonMap,
) -> DbResult<JsonMap> {
    let mut doc = fetch_in(conn, collection, id)
        .await?
        .ok_or_else(|| DbError::not_found(collection, id))?;

    for (key, value) in fields {
        doc.data.insert(key.clone(), value.clone());
    }

    let body = serde_json::to_string(&doc.data)?;
    sqlx::query("UPDATE documents SET data = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2")
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(doc.data)
}

async fn delete_in(conn: &mut SqliteConnection, collection: &str, id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
        .bind(collection)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde_json::json;

    fn body(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let db = Database::in_memory().await.unwrap();
        let docs = db.documents();

        docs.insert("items", "I1", &body(json!({"name": "Hammer", "stock": 5})))
            .await
            .unwrap();
        docs.insert("categories", "C1", &body(json!({"name": "Hardware"})))
            .await
            .unwrap();

        let item = docs.get("items", "I1").await.unwrap().unwrap();
        assert_eq!(item.data["stock"], 5);
        assert_eq!(docs.list("items").await.unwrap().len(), 1);
        assert_eq!(docs.count("categories").await.unwrap(), 1);
        assert!(docs.get("items", "C1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let db = Database::in_memory().await.unwrap();
        let docs = db.documents();
        let data = body(json!({"name": "Paper"}));

        docs.insert("items", "I1", &data).await.unwrap();
        let err = docs.insert("items", "I1", &data).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_patch_merges_only_given_fields() {
        let db = Database::in_memory().await.unwrap();
        let docs = db.documents();
        docs.insert(
            "items",
            "I1",
            &body(json!({"name": "Tape", "stock": 8, "unit": "Pcs"})),
        )
        .await
        .unwrap();

        let merged = docs
            .patch("items", "I1", &body(json!({"stock": 3})))
            .await
            .unwrap();
        assert_eq!(merged["stock"], 3);
        assert_eq!(merged["name"], "Tape");
        assert_eq!(merged["unit"], "Pcs");

        let err = docs
            .patch("items", "missing", &body(json!({"stock": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let docs = db.documents();
        docs.upsert("items", "I1", &body(json!({"name": "Vest"})))
            .await
            .unwrap();

        assert!(docs.delete("items", "I1").await.unwrap());
        assert!(!docs.delete("items", "I1").await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let db = Database::in_memory().await.unwrap();
        let docs = db.documents();
        docs.insert("items", "I1", &body(json!({"name": "Cord", "stock": 25})))
            .await
            .unwrap();

        let failing = vec![
            DocumentWrite::Patch {
                collection: "items".into(),
                id: "I1".into(),
                fields: body(json!({"stock": 20})),
            },
            DocumentWrite::Patch {
                collection: "items".into(),
                id: "ghost".into(),
                fields: body(json!({"stock": 1})),
            },
        ];
        assert!(docs.apply_batch(&failing).await.is_err());
        let item = docs.get("items", "I1").await.unwrap().unwrap();
        assert_eq!(item.data["stock"], 25);

        let ok = vec![
            DocumentWrite::Patch {
                collection: "items".into(),
                id: "I1".into(),
                fields: body(json!({"stock": 20})),
            },
            DocumentWrite::Upsert {
                collection: "transactions".into(),
                id: "T1".into(),
                data: body(json!({"itemId": "I1", "type": "OUT", "quantity": 5})),
            },
        ];
        docs.apply_batch(&ok).await.unwrap();
        let item = docs.get("items", "I1").await.unwrap().unwrap();
        assert_eq!(item.data["stock"], 20);
        assert_eq!(docs.count("transactions").await.unwrap(), 1);
    }
}
