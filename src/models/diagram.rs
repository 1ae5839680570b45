//! Diagram Data Structures
//!
//! The `Diagram` is the unit of persistence: a set of nodes and a set of
//! edges. It doubles as the portable document shape (camelCase JSON) consumed
//! and produced by the editor UI, so unknown display-only fields on nodes and
//! edges are preserved through a flattened passthrough map rather than lost.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attachment::Attachment;

/// Canvas coordinates of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Editor-facing payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Short display label
    pub label: String,

    /// Icon reference resolved by the rendering layer
    pub icon: String,

    /// Hex RGB color ("#rrggbb") or the literal "transparent"
    pub color: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,

    /// Ordering slot used by presentation mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_order: Option<i64>,
}

/// A single diagram node.
///
/// `extra` keeps whatever display-only fields the editor writes next to the
/// known ones (width, height, selected, dragging) so they survive a
/// save/load or export/import round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    pub position: Position,

    pub data: NodeData,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DiagramNode {
    /// Attachments on this node, empty slice when none were ever added
    pub fn attachments(&self) -> &[Attachment] {
        self.data.attachments.as_deref().unwrap_or(&[])
    }

    /// Mutable attachment list, materializing it on first use
    pub fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        self.data.attachments.get_or_insert_with(Vec::new)
    }
}

/// A directed edge between two nodes.
///
/// Only identity and endpoints matter to the storage engine; `animated`,
/// `label` and the flattened `extra` map (style, markerEnd, ...) are
/// display-only and carried through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The full persisted graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Diagram {
    #[serde(default)]
    pub nodes: Vec<DiagramNode>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut DiagramNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Remove a node together with every edge touching it.
    ///
    /// Returns the removed node and edges so a caller that fails to persist
    /// the change can reinsert them and leave the in-memory graph unchanged.
    pub fn remove_node(&mut self, id: &str) -> Option<(DiagramNode, Vec<Edge>)> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);

        let mut removed_edges = Vec::new();
        self.edges.retain(|edge| {
            if edge.source == id || edge.target == id {
                removed_edges.push(edge.clone());
                false
            } else {
                true
            }
        });

        Some((node, removed_edges))
    }

    /// Clear inline payloads from every image attachment.
    ///
    /// The graph store persists metadata only; payload bytes belong to the
    /// blob store.
    pub fn strip_image_payloads(&mut self) {
        for node in &mut self.nodes {
            if let Some(attachments) = node.data.attachments.as_mut() {
                for attachment in attachments.iter_mut().filter(|a| a.is_image()) {
                    attachment.data = None;
                }
            }
        }
    }
}

/// Preset swatch offered by the editor color picker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetColor {
    pub name: &'static str,
    pub value: &'static str,
}

/// Predefined color palette for quick selection
pub const PRESET_COLORS: &[PresetColor] = &[
    PresetColor { name: "Red", value: "#ef4444" },
    PresetColor { name: "Orange", value: "#f97316" },
    PresetColor { name: "Amber", value: "#f59e0b" },
    PresetColor { name: "Yellow", value: "#eab308" },
    PresetColor { name: "Lime", value: "#84cc16" },
    PresetColor { name: "Green", value: "#22c55e" },
    PresetColor { name: "Emerald", value: "#10b981" },
    PresetColor { name: "Teal", value: "#14b8a6" },
    PresetColor { name: "Cyan", value: "#06b6d4" },
    PresetColor { name: "Sky", value: "#0ea5e9" },
    PresetColor { name: "Blue", value: "#3b82f6" },
    PresetColor { name: "Indigo", value: "#6366f1" },
    PresetColor { name: "Violet", value: "#8b5cf6" },
    PresetColor { name: "Purple", value: "#a855f7" },
    PresetColor { name: "Fuchsia", value: "#d946ef" },
    PresetColor { name: "Pink", value: "#ec4899" },
    PresetColor { name: "Rose", value: "#f43f5e" },
];
