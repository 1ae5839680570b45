//! Database Error Types
//!
//! This module defines error types for storage operations, providing
//! clear error handling for connection, initialization, and query failures.
//!
//! A missing record is deliberately not an error: lookups return `Ok(None)`
//! so lazy-loading consumers can treat absence as a normal result.

use std::path::PathBuf;
use thiserror::Error;

/// Storage operation errors
///
/// Covers all failure cases for database connection, initialization,
/// and record-level operations across both storage tiers. Every variant
/// maps to a user-surfaced "storage unavailable" condition; callers must
/// not silently drop data on these.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// Write refused because the store would exceed its byte budget
    #[error("Storage quota exceeded: {context}")]
    QuotaExceeded { context: String },

    /// A persisted document failed to (de)serialize
    #[error("Document serialization failed: {0}")]
    Serialization(String),

    /// The store cannot service requests at all
    #[error("Storage unavailable: {context}")]
    Unavailable { context: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a quota exceeded error
    pub fn quota_exceeded(context: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            context: context.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(context: impl Into<String>) -> Self {
        Self::Unavailable {
            context: context.into(),
        }
    }
}
