//! In-Memory Store Substitutes
//!
//! Deterministic implementations of `BlobStore` and `GraphStore` used by
//! tests and ephemeral sessions. `MemoryBlobStore` optionally enforces a
//! byte capacity so quota-exhaustion paths can be exercised without a
//! constrained filesystem.

use crate::db::blob_store::BlobStore;
use crate::db::error::DatabaseError;
use crate::db::graph_store::GraphStore;
use crate::models::{BlobRecord, Diagram};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// HashMap-backed blob store with an optional byte budget
#[derive(Default)]
pub struct MemoryBlobStore {
    records: RwLock<HashMap<String, BlobRecord>>,
    capacity_bytes: Option<u64>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once total payload bytes would exceed
    /// `capacity_bytes`, reporting `DatabaseError::QuotaExceeded`.
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, id: &str, node_id: &str, data: &str) -> Result<(), DatabaseError> {
        let mut records = self.records.write().await;

        if let Some(capacity) = self.capacity_bytes {
            let occupied: u64 = records
                .values()
                .filter(|r| r.id != id)
                .map(|r| r.size as u64)
                .sum();
            if occupied + data.len() as u64 > capacity {
                return Err(DatabaseError::quota_exceeded(format!(
                    "{} bytes requested, {} of {} in use",
                    data.len(),
                    occupied,
                    capacity
                )));
            }
        }

        records.insert(
            id.to_string(),
            BlobRecord {
                id: id.to_string(),
                node_id: node_id.to_string(),
                data: data.to_string(),
                size: data.len() as i64,
                created_at: Utc::now().timestamp_millis(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.records.read().await.get(id).map(|r| r.data.clone()))
    }

    async fn delete_one(&self, id: &str) -> Result<(), DatabaseError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn delete_by_node(&self, node_id: &str) -> Result<(), DatabaseError> {
        self.records.write().await.retain(|_, r| r.node_id != node_id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<BlobRecord>, DatabaseError> {
        let mut records: Vec<BlobRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}

/// Single-slot in-memory graph store
#[derive(Default)]
pub struct MemoryGraphStore {
    document: RwLock<Option<Diagram>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn save(&self, diagram: &Diagram) -> Result<(), DatabaseError> {
        let mut stripped = diagram.clone();
        stripped.strip_image_payloads();
        *self.document.write().await = Some(stripped);
        Ok(())
    }

    async fn load(&self) -> Result<Option<Diagram>, DatabaseError> {
        Ok(self.document.read().await.clone())
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        *self.document.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capacity_limit_rejects_oversized_put() {
        let store = MemoryBlobStore::with_capacity(8);
        store.put("a1", "n1", "1234").await.unwrap();

        let err = store.put("a2", "n1", "123456").await.unwrap_err();
        assert!(matches!(err, DatabaseError::QuotaExceeded { .. }));

        // The failed write left existing data untouched
        assert_eq!(store.get("a1").await.unwrap().as_deref(), Some("1234"));
        assert!(store.get("a2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overwriting_a_record_does_not_double_count_quota() {
        let store = MemoryBlobStore::with_capacity(8);
        store.put("a1", "n1", "12345678").await.unwrap();
        // Same id, same size: replaces rather than adds
        store.put("a1", "n1", "87654321").await.unwrap();
        assert_eq!(store.get("a1").await.unwrap().as_deref(), Some("87654321"));
    }

    #[tokio::test]
    async fn graph_store_strips_payloads() {
        use crate::models::{Attachment, DiagramNode, NodeData, Position};

        let store = MemoryGraphStore::new();
        let mut diagram = Diagram::new();
        let mut node = DiagramNode {
            id: "n1".to_string(),
            node_type: None,
            position: Position::default(),
            data: NodeData {
                label: "Exfil".to_string(),
                icon: "Upload".to_string(),
                color: "transparent".to_string(),
                description: None,
                attachments: None,
                presentation_order: None,
            },
            extra: serde_json::Map::new(),
        };
        node.attachments_mut()
            .push(Attachment::image("dump.png", "data:image/png;base64,BBBB"));
        diagram.nodes.push(node);

        store.save(&diagram).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert!(loaded.nodes[0].attachments()[0].data.is_none());
    }
}
