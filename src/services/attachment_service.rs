//! Attachment Lifecycle Service
//!
//! The consistency-critical component: the only code path allowed to mutate
//! the blob store and the graph store within one logical operation. Every
//! operation leaves both tiers mutually consistent even if interrupted
//! between the two mutations.
//!
//! # Ordering invariant
//!
//! Blob writes complete before the corresponding graph write is issued. A
//! crash between the two leaves an orphan blob, which storage accounting can
//! report and a compaction pass can reclaim. The reverse order would leave a
//! dangling metadata reference, which cannot be repaired, so it is never
//! allowed. On the delete side the blob cleanup runs first and fails open:
//! a failed cleanup is logged and the node deletion still proceeds.
//!
//! # Retry contract
//!
//! When an operation fails the caller's in-memory `Diagram` is rolled back
//! to its pre-call state, so the UI can surface the error and retry.

use crate::db::{BlobStore, GraphStore};
use crate::models::{Attachment, AttachmentKind, Diagram};
use crate::schema::{self, limits};
use crate::services::error::AttachmentServiceError;
use std::sync::Arc;
use uuid::Uuid;

/// Offset applied to a cloned node so it does not land on its source
const CLONE_OFFSET: f64 = 40.0;

/// Orchestrates attachment mutations across both storage tiers
///
/// # Examples
///
/// ```no_run
/// use attackflow_core::db::{memory::MemoryBlobStore, memory::MemoryGraphStore};
/// use attackflow_core::models::Diagram;
/// use attackflow_core::services::AttachmentService;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = AttachmentService::new(
///         Arc::new(MemoryBlobStore::new()),
///         Arc::new(MemoryGraphStore::new()),
///     );
///     let mut diagram = Diagram::new();
///     service.reset(&mut diagram).await?;
///     Ok(())
/// }
/// ```
pub struct AttachmentService {
    blob: Arc<dyn BlobStore>,
    graph: Arc<dyn GraphStore>,
}

impl AttachmentService {
    pub fn new(blob: Arc<dyn BlobStore>, graph: Arc<dyn GraphStore>) -> Self {
        Self { blob, graph }
    }

    /// Add an image attachment to a node.
    ///
    /// The payload lands in the blob store first; only then is the metadata
    /// stub appended and the diagram persisted. If the blob write fails the
    /// diagram is untouched and no reference is ever persisted.
    pub async fn add_image(
        &self,
        diagram: &mut Diagram,
        node_id: &str,
        name: &str,
        data: &str,
    ) -> Result<Attachment, AttachmentServiceError> {
        if name.chars().count() > limits::MAX_ATTACHMENT_NAME_LEN {
            return Err(AttachmentServiceError::FieldTooLong {
                field: "attachment name",
                limit: limits::MAX_ATTACHMENT_NAME_LEN,
            });
        }
        self.check_capacity(diagram, node_id)?;

        // Metadata stub only; the payload goes to the blob store
        let mut attachment = Attachment::image(name, data);
        attachment.data = None;

        self.blob.put(&attachment.id, node_id, data).await?;

        self.append_and_persist(diagram, node_id, attachment).await
    }

    /// Add a link attachment to a node.
    ///
    /// Re-validates the URL scheme even though the schema validator already
    /// enforces the same allowlist on imports; links added directly from the
    /// editor never pass through the validator. No blob store interaction.
    pub async fn add_link(
        &self,
        diagram: &mut Diagram,
        node_id: &str,
        name: &str,
        url: &str,
    ) -> Result<Attachment, AttachmentServiceError> {
        if !schema::is_safe_url(url) {
            return Err(AttachmentServiceError::unsafe_url(url));
        }
        if url.chars().count() > limits::MAX_URL_LEN {
            return Err(AttachmentServiceError::FieldTooLong {
                field: "link URL",
                limit: limits::MAX_URL_LEN,
            });
        }
        if name.chars().count() > limits::MAX_ATTACHMENT_NAME_LEN {
            return Err(AttachmentServiceError::FieldTooLong {
                field: "attachment name",
                limit: limits::MAX_ATTACHMENT_NAME_LEN,
            });
        }
        self.check_capacity(diagram, node_id)?;

        // An empty display name falls back to the URL itself
        let display_name = if name.trim().is_empty() { url } else { name };
        let attachment = Attachment::link(display_name, url);

        self.append_and_persist(diagram, node_id, attachment).await
    }

    /// Remove a single attachment from a node.
    ///
    /// Idempotent: removing an attachment that is not present succeeds. The
    /// blob cleanup fails open; a leftover blob is an orphan the accounting
    /// pass will report.
    pub async fn remove_attachment(
        &self,
        diagram: &mut Diagram,
        node_id: &str,
        attachment_id: &str,
    ) -> Result<(), AttachmentServiceError> {
        let Some(node) = diagram.node_mut(node_id) else {
            return Err(AttachmentServiceError::node_not_found(node_id));
        };

        let removed = {
            let attachments = node.attachments_mut();
            match attachments.iter().position(|a| a.id == attachment_id) {
                Some(index) => attachments.remove(index),
                None => return Ok(()),
            }
        };
        if node.attachments().is_empty() {
            node.data.attachments = None;
        }

        if removed.is_image() {
            if let Err(e) = self.blob.delete_one(attachment_id).await {
                tracing::warn!(
                    attachment_id = %attachment_id,
                    error = %e,
                    "blob cleanup failed while removing attachment, leaving orphan"
                );
            }
        }

        if let Err(e) = self.graph.save(diagram).await {
            if let Some(node) = diagram.node_mut(node_id) {
                node.attachments_mut().push(removed);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Clone a node together with its attachments.
    ///
    /// Every attachment on the clone gets a fresh globally-unique id; image
    /// payloads are copied blob-to-blob under the new id and the new owner.
    /// The clone never references the source's attachment ids, so the two
    /// nodes can be deleted independently without destroying each other's
    /// data.
    ///
    /// Returns the id of the new node.
    pub async fn clone_node(
        &self,
        diagram: &mut Diagram,
        node_id: &str,
    ) -> Result<String, AttachmentServiceError> {
        let source = diagram
            .node(node_id)
            .cloned()
            .ok_or_else(|| AttachmentServiceError::node_not_found(node_id))?;

        let mut clone = source;
        clone.id = Uuid::new_v4().to_string();
        clone.position.x += CLONE_OFFSET;
        clone.position.y += CLONE_OFFSET;

        if let Some(attachments) = clone.data.attachments.take() {
            let mut copied = Vec::with_capacity(attachments.len());
            for attachment in attachments {
                match attachment.kind {
                    AttachmentKind::Link => copied.push(attachment.duplicate()),
                    AttachmentKind::Image => {
                        let Some(payload) = self.blob.get(&attachment.id).await? else {
                            tracing::warn!(
                                attachment_id = %attachment.id,
                                source_node = %node_id,
                                "source blob missing, dropping attachment from clone"
                            );
                            continue;
                        };
                        let fresh = attachment.duplicate();
                        self.blob.put(&fresh.id, &clone.id, &payload).await?;
                        copied.push(fresh);
                    }
                }
            }
            if !copied.is_empty() {
                clone.data.attachments = Some(copied);
            }
        }

        let clone_id = clone.id.clone();
        diagram.nodes.push(clone);

        if let Err(e) = self.graph.save(diagram).await {
            diagram.nodes.retain(|n| n.id != clone_id);
            // Reclaim the blob copies made above; failing that they become
            // orphans visible to storage accounting.
            if let Err(cleanup) = self.blob.delete_by_node(&clone_id).await {
                tracing::warn!(
                    node_id = %clone_id,
                    error = %cleanup,
                    "failed to reclaim blobs of aborted clone"
                );
            }
            return Err(e.into());
        }

        Ok(clone_id)
    }

    /// Delete a node, its incident edges, and every blob it owns.
    ///
    /// The blob cascade runs first and fails open: a failed cleanup leaves
    /// orphan blobs (recoverable) rather than blocking the deletion.
    pub async fn delete_node(
        &self,
        diagram: &mut Diagram,
        node_id: &str,
    ) -> Result<(), AttachmentServiceError> {
        if diagram.node(node_id).is_none() {
            return Err(AttachmentServiceError::node_not_found(node_id));
        }

        if let Err(e) = self.blob.delete_by_node(node_id).await {
            tracing::warn!(
                node_id = %node_id,
                error = %e,
                "blob cleanup failed during node deletion, continuing"
            );
        }

        let removed = diagram.remove_node(node_id);

        if let Err(e) = self.graph.save(diagram).await {
            if let Some((node, edges)) = removed {
                diagram.nodes.push(node);
                diagram.edges.extend(edges);
            }
            return Err(e.into());
        }

        tracing::info!(node_id = %node_id, "node deleted");
        Ok(())
    }

    /// Reset the entire diagram: wipe all blobs, then the persisted document.
    pub async fn reset(&self, diagram: &mut Diagram) -> Result<(), AttachmentServiceError> {
        self.blob.clear().await?;
        self.graph.clear().await?;
        *diagram = Diagram::new();
        tracing::info!("diagram reset");
        Ok(())
    }

    fn check_capacity(
        &self,
        diagram: &Diagram,
        node_id: &str,
    ) -> Result<(), AttachmentServiceError> {
        let node = diagram
            .node(node_id)
            .ok_or_else(|| AttachmentServiceError::node_not_found(node_id))?;
        if node.attachments().len() >= limits::MAX_ATTACHMENTS_PER_NODE {
            return Err(AttachmentServiceError::AttachmentLimitReached {
                node_id: node_id.to_string(),
                limit: limits::MAX_ATTACHMENTS_PER_NODE,
            });
        }
        Ok(())
    }

    async fn append_and_persist(
        &self,
        diagram: &mut Diagram,
        node_id: &str,
        attachment: Attachment,
    ) -> Result<Attachment, AttachmentServiceError> {
        let Some(node) = diagram.node_mut(node_id) else {
            return Err(AttachmentServiceError::node_not_found(node_id));
        };
        node.attachments_mut().push(attachment.clone());

        if let Err(e) = self.graph.save(diagram).await {
            if let Some(node) = diagram.node_mut(node_id) {
                node.attachments_mut().retain(|a| a.id != attachment.id);
                if node.attachments().is_empty() {
                    node.data.attachments = None;
                }
            }
            return Err(e.into());
        }
        Ok(attachment)
    }
}
