//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for Attackflow's two-tier storage layout.
//!
//! # Architecture
//!
//! - **Explicit lifecycle**: the service is constructed once with a path (or
//!   in-memory for tests) and injected into the stores; there is no ambient
//!   global handle
//! - **Two tables, one file**: `attachments` (blob tier, indexed by owning
//!   node) and `diagram_document` (graph tier, single fixed slot)
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Idempotent schema**: CREATE TABLE IF NOT EXISTS, safe to call twice
//!
//! # Database Connection Patterns
//!
//! Use `connect_with_timeout()` in async functions. The 5-second busy
//! timeout allows concurrent operations to wait and retry instead of
//! failing immediately with `SQLITE_BUSY` errors when Tokio moves futures
//! between threads.
//!
//! ```no_run
//! # use attackflow_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseService::new(PathBuf::from("./data/attackflow.db")).await?;
//! let conn = db.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use attackflow_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("/path/to/attackflow.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing across stores)
    pub db: Arc<Database>,

    /// Path to the database file (":memory:" for the in-memory variant)
    pub db_path: PathBuf,

    /// Keep-alive connection for the in-memory variant. A shared-cache
    /// memory database is torn down the moment its last connection closes,
    /// so the service holds one open connection to keep it alive for as long
    /// as the service (or any clone of it) lives. `None` for on-disk databases.
    #[allow(dead_code)]
    keep_alive: Option<Arc<libsql::Connection>>,
}

impl std::fmt::Debug for DatabaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseService")
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable SQLite features (WAL mode, busy timeout)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            keep_alive: None,
        };

        service.initialize_schema().await?;

        tracing::debug!(path = %service.db_path.display(), "database initialized");
        Ok(service)
    }

    /// Create an in-memory DatabaseService for tests and ephemeral sessions
    pub async fn new_in_memory() -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(":memory:");
        // A bare ":memory:" path gives each connection its own private database,
        // so the schema created at init is invisible to the connections the
        // stores open later. A named shared-cache memory database is instead
        // shared across every connection of this service; a per-instance
        // counter keeps separate services (e.g. parallel tests) isolated.
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let conn_str = format!(
            "file:attackflow-memdb-{}?mode=memory&cache=shared",
            COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let db = Builder::new_local(&conn_str)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;
        let db = Arc::new(db);

        // Hold one connection open so the shared-cache memory database is not
        // destroyed between the connections the stores open on demand.
        let keep_alive = db
            .connect()
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db,
            db_path,
            keep_alive: Some(Arc::new(keep_alive)),
        };

        service.initialize_schema().await?;
        Ok(service)
    }

    /// Get a connection handle without the busy-timeout pragma.
    ///
    /// Prefer `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::from)
    }

    /// Get a connection with a 5-second busy timeout applied.
    ///
    /// The timeout makes SQLite wait and retry on lock contention instead of
    /// failing immediately, which matters once Tokio interleaves operations.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        Ok(conn)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of
    /// execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Creates both storage tiers using CREATE TABLE IF NOT EXISTS, ensuring
    /// idempotent initialization (safe to call multiple times).
    ///
    /// # Schema
    ///
    /// - `attachments`: one row per blob, keyed by attachment id with a
    ///   secondary index on the owning node id for cascade deletes
    /// - `diagram_document`: the serialized graph document under a fixed slot
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS attachments (
                id TEXT PRIMARY KEY,
                node_id TEXT NOT NULL,
                data TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create attachments table: {}", e))
        })?;

        // Secondary index used by delete_by_node; one cascade per node delete
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attachments_node ON attachments(node_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_attachments_node': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS diagram_document (
                slot TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                saved_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create diagram_document table: {}",
                e
            ))
        })?;

        Ok(())
    }
}
