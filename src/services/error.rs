//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations, providing
//! detailed error handling for lifecycle and import/export failures.
//!
//! Import keeps two distinct fatal cases: `Malformed` (the bytes are not a
//! JSON document at all) and `Schema` (parsed but violates the document
//! schema, with the full violation list attached). Unsafe link URLs are not
//! fatal; they surface as `ImportWarning`s on the successful outcome.

use crate::db::DatabaseError;
use crate::schema::SchemaViolations;
use std::fmt;
use thiserror::Error;

/// Attachment lifecycle operation errors
#[derive(Error, Debug)]
pub enum AttachmentServiceError {
    /// Target node does not exist in the diagram
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Link URL failed the scheme allowlist
    #[error("Unsafe attachment URL rejected: {url}")]
    UnsafeUrl { url: String },

    /// Node already carries the maximum number of attachments
    #[error("Attachment limit reached for node {node_id} (max {limit})")]
    AttachmentLimitReached { node_id: String, limit: usize },

    /// An input field exceeds its length ceiling
    #[error("{field} exceeds the maximum length of {limit} characters")]
    FieldTooLong { field: &'static str, limit: usize },

    /// Underlying store could not complete the operation
    #[error("Storage operation failed: {0}")]
    Storage(#[from] DatabaseError),
}

impl AttachmentServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create an unsafe URL error
    pub fn unsafe_url(url: impl Into<String>) -> Self {
        Self::UnsafeUrl { url: url.into() }
    }
}

/// Import pipeline errors (the whole document is rejected)
#[derive(Error, Debug)]
pub enum ImportError {
    /// Raw bytes are not parseable JSON; nothing was written to any store
    #[error("Malformed diagram file: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Parsed but fails the document schema; the full violation list is
    /// attached and nothing was written to any store
    #[error("{0}")]
    Schema(#[from] SchemaViolations),

    /// A store write failed while seeding imported payloads
    #[error("Storage operation failed: {0}")]
    Storage(#[from] DatabaseError),
}

/// Export pipeline errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// The assembled document failed to serialize
    #[error("Failed to serialize diagram: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blob read failed while embedding payloads
    #[error("Storage operation failed: {0}")]
    Storage(#[from] DatabaseError),
}

/// Non-fatal conditions recorded while an import proceeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// A link attachment was dropped because its URL scheme is disallowed
    UnsafeLinkDropped {
        node_id: String,
        attachment_id: String,
        url: String,
    },

    /// An image attachment arrived without an inline payload; its metadata
    /// was kept but no blob could be seeded
    MissingImagePayload {
        node_id: String,
        attachment_id: String,
    },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsafeLinkDropped {
                node_id,
                attachment_id,
                url,
            } => write!(
                f,
                "dropped link attachment {} on node {} (unsafe URL {})",
                attachment_id, node_id, url
            ),
            Self::MissingImagePayload {
                node_id,
                attachment_id,
            } => write!(
                f,
                "image attachment {} on node {} has no inline payload",
                attachment_id, node_id
            ),
        }
    }
}
