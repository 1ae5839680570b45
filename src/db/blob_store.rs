//! BlobStore Trait and libsql Implementation
//!
//! The blob store is the persistence tier for attachment payload bytes.
//! Records are keyed by attachment id with a secondary index on the owning
//! node id, so deleting a node cascades to every payload it owns without
//! scanning the table.
//!
//! The trait keeps the business layer backend-agnostic: production code uses
//! `TursoBlobStore` (libsql), tests can inject
//! [`MemoryBlobStore`](crate::db::memory::MemoryBlobStore).

use crate::db::error::DatabaseError;
use crate::db::DatabaseService;
use crate::models::BlobRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Abstraction over attachment payload persistence
///
/// All methods are async; implementations must be `Send + Sync` so futures
/// can move between threads.
///
/// Unknown ids are a normal result (`Ok(None)`), never an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upsert a payload under its attachment id and owning node id.
    ///
    /// Idempotent: repeated calls with the same id overwrite the record
    /// in place, re-pointing the owner index if the owner changed.
    async fn put(&self, id: &str, node_id: &str, data: &str) -> Result<(), DatabaseError>;

    /// Point lookup by attachment id.
    ///
    /// Returns `Ok(None)` when the id has no record; lazy-loading consumers
    /// treat that as an ordinary miss.
    async fn get(&self, id: &str) -> Result<Option<String>, DatabaseError>;

    /// Delete a single record. Deleting a missing id succeeds (no-op).
    async fn delete_one(&self, id: &str) -> Result<(), DatabaseError>;

    /// Delete every record owned by a node (cascade on node deletion/reset).
    async fn delete_by_node(&self, node_id: &str) -> Result<(), DatabaseError>;

    /// Wipe all records (full diagram reset).
    async fn clear(&self) -> Result<(), DatabaseError>;

    /// Every record including payloads.
    ///
    /// For storage accounting only; this materializes all payload bytes and
    /// must stay off hot paths.
    async fn list_all(&self) -> Result<Vec<BlobRecord>, DatabaseError>;
}

/// BlobStore implementation backed by the shared libsql database
pub struct TursoBlobStore {
    db: Arc<DatabaseService>,
}

impl TursoBlobStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    fn record_from_row(row: &libsql::Row) -> Result<BlobRecord, DatabaseError> {
        Ok(BlobRecord {
            id: row.get(0)?,
            node_id: row.get(1)?,
            data: row.get(2)?,
            size: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

#[async_trait]
impl BlobStore for TursoBlobStore {
    async fn put(&self, id: &str, node_id: &str, data: &str) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let size = data.len() as i64;
        let created_at = Utc::now().timestamp_millis();

        conn.execute(
            "INSERT INTO attachments (id, node_id, data, size, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                node_id = excluded.node_id,
                data = excluded.data,
                size = excluded.size",
            (id, node_id, data, size, created_at),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to upsert attachment {}: {}", id, e))
        })?;

        tracing::debug!(attachment_id = %id, owner = %node_id, size, "blob stored");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let mut rows = conn
            .query("SELECT data FROM attachments WHERE id = ?", [id])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to query attachment {}: {}", id, e))
            })?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn delete_one(&self, id: &str) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        conn.execute("DELETE FROM attachments WHERE id = ?", [id])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to delete attachment {}: {}", id, e))
            })?;
        Ok(())
    }

    async fn delete_by_node(&self, node_id: &str) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let deleted = conn
            .execute("DELETE FROM attachments WHERE node_id = ?", [node_id])
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to delete attachments of node {}: {}",
                    node_id, e
                ))
            })?;

        tracing::debug!(owner = %node_id, deleted, "blob cascade delete");
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        conn.execute("DELETE FROM attachments", ())
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to clear attachments: {}", e))
            })?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<BlobRecord>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT id, node_id, data, size, created_at FROM attachments ORDER BY created_at",
                (),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to list attachments: {}", e))
            })?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::record_from_row(&row)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> TursoBlobStore {
        let db = Arc::new(DatabaseService::new_in_memory().await.unwrap());
        TursoBlobStore::new(db)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = test_store().await;
        store.put("a1", "n1", "data:image/png;base64,AAAA").await.unwrap();

        let payload = store.get("a1").await.unwrap();
        assert_eq!(payload.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[tokio::test]
    async fn get_unknown_id_is_none_not_error() {
        let store = test_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_is_idempotent_upsert() {
        let store = test_store().await;
        store.put("a1", "n1", "v1").await.unwrap();
        store.put("a1", "n1", "v2").await.unwrap();

        assert_eq!(store.get("a1").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_by_node_spares_other_owners() {
        let store = test_store().await;
        store.put("a1", "n1", "one").await.unwrap();
        store.put("a2", "n1", "two").await.unwrap();
        store.put("b1", "n2", "other").await.unwrap();

        store.delete_by_node("n1").await.unwrap();

        assert!(store.get("a1").await.unwrap().is_none());
        assert!(store.get("a2").await.unwrap().is_none());
        assert_eq!(store.get("b1").await.unwrap().as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn clear_wipes_everything() {
        let store = test_store().await;
        store.put("a1", "n1", "one").await.unwrap();
        store.put("b1", "n2", "two").await.unwrap();

        store.clear().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_all_reports_sizes() {
        let store = test_store().await;
        store.put("a1", "n1", "12345").await.unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, 5);
        assert_eq!(records[0].node_id, "n1");
        assert!(records[0].created_at > 0);
    }
}
