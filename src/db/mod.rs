//! Database Layer
//!
//! This module handles both persistence tiers over a single libsql file:
//!
//! - `DatabaseService` - connection lifecycle and idempotent schema setup
//! - `BlobStore` / `TursoBlobStore` - attachment payload bytes, indexed by
//!   owning node
//! - `GraphStore` / `TursoGraphStore` - the serialized diagram document
//!   (metadata only) under a fixed slot
//! - `memory` - deterministic in-memory substitutes for tests
//!
//! # Architecture
//!
//! The stores are explicitly constructed objects sharing one injected
//! `DatabaseService`; there is no ambient global handle. Record-level
//! operations are individually atomic; cross-store ordering is owned by the
//! service layer.

mod blob_store;
mod database;
mod error;
mod graph_store;
pub mod memory;

pub use blob_store::{BlobStore, TursoBlobStore};
pub use database::DatabaseService;
pub use error::DatabaseError;
pub use graph_store::{GraphStore, TursoGraphStore, DIAGRAM_SLOT};
