//! Attackflow Core Storage Engine
//!
//! This crate keeps an attack-flow diagram durable: graph topology and
//! attachment metadata in one fast tier, attachment payload bytes in a
//! second blob tier, with referential integrity enforced between the two.
//!
//! # Architecture
//!
//! - **Two-tier storage**: the graph store persists the serialized document
//!   (metadata only) under a fixed slot; the blob store holds one record per
//!   attachment payload, indexed by owning node
//! - **Centralized consistency**: `AttachmentService` is the only component
//!   mutating both tiers in one operation, and always writes blobs before
//!   metadata
//! - **Strict imports**: untrusted documents pass a self-contained schema
//!   validator that reports every violation, then a redundant URL
//!   sanitization pass
//! - **libsql/SQLite**: both tiers share one embedded database file with an
//!   explicit, injectable connection lifecycle
//!
//! # Modules
//!
//! - [`models`] - Diagram, nodes, edges, attachments, blob records
//! - [`schema`] - document validation and safety predicates
//! - [`services`] - lifecycle, import/export, storage accounting
//! - [`db`] - database layer with libsql integration and in-memory
//!   substitutes

pub mod db;
pub mod models;
pub mod schema;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
