//! Attachment Data Structures
//!
//! An attachment is either an external link or an inline image owned by a
//! single diagram node. Image payloads travel as data URIs in portable
//! documents but live canonically in the blob store; the metadata kept on the
//! node never carries payload bytes at rest.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator for the two attachment flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Link,
    Image,
}

/// Attachment metadata as carried on a diagram node.
///
/// For `image` attachments the `data` field is populated only in transit
/// (portable documents, fresh uploads). The graph store strips it before
/// persisting; the blob store holds the canonical payload keyed by `id`.
///
/// # Examples
///
/// ```rust
/// use attackflow_core::models::{Attachment, AttachmentKind};
///
/// let link = Attachment::link("Campaign report", "https://example.com/report");
/// assert_eq!(link.kind, AttachmentKind::Link);
/// assert!(link.data.is_none());
///
/// let shot = Attachment::image("beacon.png", "data:image/png;base64,AAAA");
/// assert!(shot.data.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique across the whole store, not just within a node
    pub id: String,

    #[serde(rename = "type")]
    pub kind: AttachmentKind,

    /// Display name
    pub name: String,

    /// Target URL (link attachments only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Inline payload as a data URI (image attachments, transit only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Creation timestamp in epoch milliseconds
    pub created_at: i64,
}

impl Attachment {
    /// Create a link attachment with a fresh id and timestamp
    pub fn link(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: AttachmentKind::Link,
            name: name.into(),
            url: Some(url.into()),
            data: None,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Create an image attachment carrying its inline payload
    pub fn image(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: AttachmentKind::Image,
            name: name.into(),
            url: None,
            data: Some(data.into()),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Copy this attachment under a fresh identity.
    ///
    /// Used when cloning a node: the clone must never alias the source's
    /// attachment ids, otherwise deleting one node's attachments would
    /// destroy the other's blobs.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now().timestamp_millis(),
            ..self.clone()
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }

    pub fn is_link(&self) -> bool {
        self.kind == AttachmentKind::Link
    }
}

/// Blob store record: the canonical copy of an image payload.
///
/// `node_id` is the owning node, maintained as a secondary index so a node
/// deletion can cascade to every blob it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRecord {
    pub id: String,
    pub node_id: String,
    pub data: String,
    pub size: i64,
    pub created_at: i64,
}
