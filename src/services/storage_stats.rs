//! Storage Accounting
//!
//! Read-only reporting over the blob store: how many payloads exist, how
//! many bytes they occupy, and how that compares to an optional quota. Used
//! by the editor's storage monitor panel; never mutates either store.

use crate::db::{BlobStore, DatabaseError};
use std::sync::Arc;

/// Aggregate blob usage snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct StorageStats {
    /// Number of blob records
    pub total_attachments: usize,

    /// Sum of payload sizes in bytes
    pub total_bytes: u64,

    /// Configured quota, if any
    pub quota_bytes: Option<u64>,

    /// Percentage of the quota in use (0.0 when no quota is configured)
    pub usage_percent: f64,

    /// Human-readable total ("1.5 MB")
    pub formatted_size: String,

    /// Human-readable quota ("Unknown" when none is configured)
    pub formatted_quota: String,
}

/// Read-only accounting view over a blob store
pub struct StorageMonitor {
    blob: Arc<dyn BlobStore>,
    quota_bytes: Option<u64>,
}

impl StorageMonitor {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self {
            blob,
            quota_bytes: None,
        }
    }

    /// Monitor that reports usage against a byte quota
    pub fn with_quota(blob: Arc<dyn BlobStore>, quota_bytes: u64) -> Self {
        Self {
            blob,
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Collect the current usage snapshot.
    ///
    /// Walks every record via `list_all`, so this belongs on a settings
    /// panel refresh, not on a hot path.
    pub async fn stats(&self) -> Result<StorageStats, DatabaseError> {
        let records = self.blob.list_all().await?;
        let total_bytes: u64 = records.iter().map(|r| r.size.max(0) as u64).sum();
        let usage_percent = match self.quota_bytes {
            Some(quota) if quota > 0 => (total_bytes as f64 / quota as f64) * 100.0,
            _ => 0.0,
        };

        Ok(StorageStats {
            total_attachments: records.len(),
            total_bytes,
            quota_bytes: self.quota_bytes,
            usage_percent,
            formatted_size: format_bytes(total_bytes),
            formatted_quota: self
                .quota_bytes
                .map(format_bytes)
                .unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}

/// Format a byte count as "512 B", "1.5 KB", "2.25 MB", "1 GB".
///
/// Up to two decimals, trailing zeros trimmed.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", size);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
