//! GraphStore Trait and libsql Implementation
//!
//! The graph store persists the lightweight diagram document: node/edge
//! structure plus attachment *metadata*. It is the single source of truth
//! for topology and never for payload bytes; `save` strips inline image
//! payloads before writing so this tier stays small and fast to load.
//!
//! One fixed logical slot holds the current document, mirroring the
//! editor's single-diagram persistence model.

use crate::db::error::DatabaseError;
use crate::db::DatabaseService;
use crate::models::Diagram;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Logical key of the persisted document
pub const DIAGRAM_SLOT: &str = "current";

/// Abstraction over diagram document persistence
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Serialize and persist the diagram, metadata-only.
    ///
    /// Inline image payloads are stripped from a copy before writing; the
    /// caller's diagram is never mutated.
    async fn save(&self, diagram: &Diagram) -> Result<(), DatabaseError>;

    /// Load the last-saved diagram.
    ///
    /// Image attachments come back as metadata stubs with no payload; the
    /// payload is intentionally not re-joined from the blob store here, so
    /// opening the editor costs O(graph size), not O(total attachment bytes).
    async fn load(&self) -> Result<Option<Diagram>, DatabaseError>;

    /// Remove the persisted document.
    async fn clear(&self) -> Result<(), DatabaseError>;
}

/// GraphStore implementation backed by the shared libsql database
pub struct TursoGraphStore {
    db: Arc<DatabaseService>,
}

impl TursoGraphStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GraphStore for TursoGraphStore {
    async fn save(&self, diagram: &Diagram) -> Result<(), DatabaseError> {
        let mut stripped = diagram.clone();
        stripped.strip_image_payloads();

        let body = serde_json::to_string(&stripped)
            .map_err(|e| DatabaseError::serialization(e.to_string()))?;
        let saved_at = Utc::now().timestamp_millis();

        let conn = self.db.connect_with_timeout().await?;
        conn.execute(
            "INSERT INTO diagram_document (slot, body, saved_at)
             VALUES (?, ?, ?)
             ON CONFLICT(slot) DO UPDATE SET
                body = excluded.body,
                saved_at = excluded.saved_at",
            (DIAGRAM_SLOT, body, saved_at),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to save diagram: {}", e)))?;

        tracing::debug!(
            nodes = stripped.nodes.len(),
            edges = stripped.edges.len(),
            "diagram persisted"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<Diagram>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT body FROM diagram_document WHERE slot = ?",
                [DIAGRAM_SLOT],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to load diagram: {}", e)))?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let body: String = row.get(0)?;
        let diagram = serde_json::from_str(&body)
            .map_err(|e| DatabaseError::serialization(format!("stored document corrupt: {}", e)))?;
        Ok(Some(diagram))
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        conn.execute(
            "DELETE FROM diagram_document WHERE slot = ?",
            [DIAGRAM_SLOT],
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to clear diagram: {}", e)))?;
        Ok(())
    }
}
