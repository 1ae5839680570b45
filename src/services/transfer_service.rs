//! Import/Export Pipeline
//!
//! Turns the persisted two-tier state into a fully self-contained portable
//! document and back. Export re-embeds blob payloads into a deep copy of the
//! diagram; import validates untrusted JSON against the schema, drops unsafe
//! link attachments individually, seeds the blob store from inline payloads,
//! and hands back a metadata-only diagram for the caller to persist.
//!
//! The URL scheme allowlist is applied twice on import: once through the
//! schema validator's report and once more by an independent sanitization
//! pass. The redundancy is deliberate so a future schema change cannot
//! silently reopen the hole.

use crate::db::BlobStore;
use crate::models::{AttachmentKind, Diagram};
use crate::schema::{self, validate_document};
use crate::services::error::{ExportError, ImportError, ImportWarning};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a successful import
#[derive(Debug)]
pub struct ImportOutcome {
    /// Sanitized, metadata-only diagram. The caller persists it via the
    /// graph store.
    pub diagram: Diagram,

    /// Non-fatal conditions encountered along the way
    pub warnings: Vec<ImportWarning>,
}

/// Import/export pipeline over the blob store
pub struct TransferService {
    blob: Arc<dyn BlobStore>,
}

impl TransferService {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self { blob }
    }

    /// Produce a fully self-contained portable document.
    ///
    /// Works on a deep copy; the live diagram is never mutated. Image
    /// attachments missing their payload (the normal case, since the graph
    /// store strips them) are re-joined from the blob store. A missing blob
    /// is logged and the stub exported as-is rather than failing the whole
    /// export.
    pub async fn export(&self, diagram: &Diagram) -> Result<String, ExportError> {
        let mut copy = diagram.clone();

        for node in &mut copy.nodes {
            let node_id = node.id.clone();
            let Some(attachments) = node.data.attachments.as_mut() else {
                continue;
            };
            for attachment in attachments.iter_mut() {
                if attachment.kind != AttachmentKind::Image || attachment.data.is_some() {
                    continue;
                }
                match self.blob.get(&attachment.id).await? {
                    Some(payload) => attachment.data = Some(payload),
                    None => tracing::warn!(
                        attachment_id = %attachment.id,
                        node_id = %node_id,
                        "blob missing during export, emitting metadata stub"
                    ),
                }
            }
        }

        Ok(serde_json::to_string_pretty(&copy)?)
    }

    /// Validate, sanitize, and absorb an externally supplied document.
    ///
    /// 1. Parse failure is `ImportError::Malformed`; nothing is written.
    /// 2. Schema violations abort with the complete list; nothing is written.
    /// 3. Unsafe link attachments are dropped one by one with a warning,
    ///    never failing the import as a whole.
    /// 4. Inline image payloads are seeded into the blob store under their
    ///    declared id and owner, then stripped, so the returned diagram
    ///    matches the graph store's metadata-only convention.
    pub async fn import(&self, raw: &str) -> Result<ImportOutcome, ImportError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(ImportError::Malformed)?;

        let report = validate_document(&value)?;
        let mut diagram = report.diagram;
        let mut warnings = Vec::new();

        // First line of defense: drop what the validator flagged.
        let flagged: HashSet<String> = report
            .unsafe_links
            .iter()
            .map(|u| u.attachment_id.clone())
            .collect();

        for node in &mut diagram.nodes {
            let node_id = node.id.clone();
            let Some(attachments) = node.data.attachments.as_mut() else {
                continue;
            };
            attachments.retain(|attachment| {
                if attachment.kind != AttachmentKind::Link {
                    return true;
                }
                let url = attachment.url.as_deref().unwrap_or("");
                // Second line of defense: re-derive safety independently of
                // the validator instead of trusting its flags alone.
                if !flagged.contains(&attachment.id) && schema::is_safe_url(url) {
                    return true;
                }
                tracing::warn!(
                    attachment_id = %attachment.id,
                    node_id = %node_id,
                    url = %url,
                    "dropping link attachment with disallowed URL scheme"
                );
                warnings.push(ImportWarning::UnsafeLinkDropped {
                    node_id: node_id.clone(),
                    attachment_id: attachment.id.clone(),
                    url: url.to_string(),
                });
                false
            });
            if attachments.is_empty() {
                node.data.attachments = None;
            }
        }

        // Seed the blob store, then strip payloads from the metadata tier.
        for node in &mut diagram.nodes {
            let node_id = node.id.clone();
            let Some(attachments) = node.data.attachments.as_mut() else {
                continue;
            };
            for attachment in attachments.iter_mut() {
                if attachment.kind != AttachmentKind::Image {
                    continue;
                }
                match attachment.data.take() {
                    Some(payload) => {
                        self.blob.put(&attachment.id, &node_id, &payload).await?;
                    }
                    None => {
                        warnings.push(ImportWarning::MissingImagePayload {
                            node_id: node_id.clone(),
                            attachment_id: attachment.id.clone(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            nodes = diagram.nodes.len(),
            edges = diagram.edges.len(),
            warnings = warnings.len(),
            "diagram imported"
        );
        Ok(ImportOutcome { diagram, warnings })
    }
}
