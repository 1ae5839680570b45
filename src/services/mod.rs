//! Business Services
//!
//! This module contains the core services of the storage engine:
//!
//! - `AttachmentService` - attachment lifecycle across both storage tiers
//!   (the only dual-store mutator)
//! - `TransferService` - portable document export and validated import
//! - `StorageMonitor` - read-only blob usage accounting
//!
//! Services coordinate between the database layer and the editor,
//! centralizing the blob-before-metadata ordering invariant instead of
//! re-deriving it at each call site.

pub mod attachment_service;
pub mod error;
pub mod storage_stats;
pub mod transfer_service;

pub use attachment_service::AttachmentService;
pub use error::{AttachmentServiceError, ExportError, ImportError, ImportWarning};
pub use storage_stats::{format_bytes, StorageMonitor, StorageStats};
pub use transfer_service::{ImportOutcome, TransferService};
