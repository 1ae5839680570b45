//! Data Models
//!
//! This module contains the core data structures used throughout Attackflow:
//!
//! - `Diagram`, `DiagramNode`, `Edge` - the persisted graph and its portable
//!   document shape
//! - `Attachment` - link/image metadata carried on nodes
//! - `BlobRecord` - the blob store's canonical payload entity
//!
//! All document types serialize as camelCase JSON, matching the portable
//! format exchanged with the editor UI.

mod attachment;
mod diagram;

pub use attachment::{Attachment, AttachmentKind, BlobRecord};
pub use diagram::{
    Diagram, DiagramNode, Edge, NodeData, Position, PresetColor, PRESET_COLORS,
};
