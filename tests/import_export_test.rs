//! Import/export pipeline integration tests
//!
//! Covers the portable document round trip, partial tolerance for unsafe
//! link attachments, and the all-or-nothing behavior of parse and schema
//! failures.

use attackflow_core::db::memory::{MemoryBlobStore, MemoryGraphStore};
use attackflow_core::db::{BlobStore, GraphStore};
use attackflow_core::models::{Diagram, DiagramNode, Edge, NodeData, Position};
use attackflow_core::services::{
    AttachmentService, ImportError, ImportWarning, TransferService,
};
use serde_json::json;
use std::sync::Arc;

fn flow_node(id: &str, label: &str) -> DiagramNode {
    DiagramNode {
        id: id.to_string(),
        node_type: Some("custom".to_string()),
        position: Position { x: 40.0, y: 80.0 },
        data: NodeData {
            label: label.to_string(),
            icon: "Target".to_string(),
            color: "#3b82f6".to_string(),
            description: Some("step in the intrusion".to_string()),
            attachments: None,
            presentation_order: None,
        },
        extra: serde_json::Map::new(),
    }
}

struct Stores {
    blob: Arc<dyn BlobStore>,
    graph: Arc<dyn GraphStore>,
    lifecycle: AttachmentService,
    transfer: TransferService,
}

fn fresh_stores() -> Stores {
    let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let graph: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new());
    Stores {
        lifecycle: AttachmentService::new(blob.clone(), graph.clone()),
        transfer: TransferService::new(blob.clone()),
        blob,
        graph,
    }
}

#[tokio::test]
async fn export_then_import_round_trips_structure_and_payloads() {
    let origin = fresh_stores();
    let mut diagram = Diagram {
        nodes: vec![flow_node("n1", "Initial Access"), flow_node("n2", "Execution")],
        edges: vec![Edge {
            id: "e1".to_string(),
            source: "n1".to_string(),
            target: "n2".to_string(),
            edge_type: None,
            animated: Some(true),
            label: Some("then".to_string()),
            extra: serde_json::Map::new(),
        }],
    };

    let image = origin
        .lifecycle
        .add_image(&mut diagram, "n1", "payload.png", "data:image/png;base64,CAFE")
        .await
        .unwrap();
    origin
        .lifecycle
        .add_link(&mut diagram, "n2", "technique", "https://attack.mitre.org/techniques/T1059/")
        .await
        .unwrap();

    let document = origin.transfer.export(&diagram).await.unwrap();

    // The portable document is self-contained: the payload is inlined
    let raw: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(
        raw["nodes"][0]["data"]["attachments"][0]["data"],
        "data:image/png;base64,CAFE"
    );

    // Absorb it into a completely fresh pair of stores
    let dest = fresh_stores();
    let outcome = dest.transfer.import(&document).await.unwrap();

    assert!(outcome.warnings.is_empty());
    // The imported diagram matches the live one structurally
    // (both are metadata-only; payload equality is checked via the store)
    assert_eq!(outcome.diagram, diagram);
    assert_eq!(
        dest.blob.get(&image.id).await.unwrap().as_deref(),
        Some("data:image/png;base64,CAFE")
    );

    // Caller persists the outcome; a reload sees the same document
    dest.graph.save(&outcome.diagram).await.unwrap();
    assert_eq!(dest.graph.load().await.unwrap().unwrap(), outcome.diagram);
}

#[tokio::test]
async fn unsafe_link_is_dropped_but_import_proceeds() {
    let stores = fresh_stores();
    let document = json!({
        "nodes": [
            {
                "id": "n1",
                "position": {"x": 0.0, "y": 0.0},
                "data": {
                    "label": "Delivery",
                    "icon": "Mail",
                    "color": "#ef4444",
                    "attachments": [
                        {
                            "id": "bad",
                            "type": "link",
                            "name": "totally safe",
                            "url": "javascript:alert(document.cookie)",
                            "createdAt": 1700000000000i64
                        },
                        {
                            "id": "good",
                            "type": "link",
                            "name": "reference",
                            "url": "https://attack.mitre.org",
                            "createdAt": 1700000000000i64
                        }
                    ]
                }
            }
        ],
        "edges": []
    });

    let outcome = stores.transfer.import(&document.to_string()).await.unwrap();

    let attachments = outcome.diagram.nodes[0].attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].id, "good");

    assert_eq!(outcome.warnings.len(), 1);
    assert!(matches!(
        &outcome.warnings[0],
        ImportWarning::UnsafeLinkDropped { attachment_id, .. } if attachment_id == "bad"
    ));
}

#[tokio::test]
async fn node_ceiling_violation_aborts_with_nothing_written() {
    let stores = fresh_stores();
    let nodes: Vec<serde_json::Value> = (0..1001)
        .map(|i| {
            json!({
                "id": format!("n{}", i),
                "position": {"x": 0.0, "y": 0.0},
                "data": {"label": "node", "icon": "Box", "color": "#22c55e"}
            })
        })
        .collect();
    let document = json!({"nodes": nodes, "edges": []});

    let err = stores.transfer.import(&document.to_string()).await.unwrap_err();

    let ImportError::Schema(violations) = err else {
        panic!("expected schema violation, got {:?}", err);
    };
    assert!(violations.violations.iter().any(|v| v.path == "nodes"));

    // All-or-nothing: neither tier was touched
    assert!(stores.blob.list_all().await.unwrap().is_empty());
    assert!(stores.graph.load().await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_bytes_are_distinct_from_schema_violations() {
    let stores = fresh_stores();

    let err = stores.transfer.import("this is not { json").await.unwrap_err();
    assert!(matches!(err, ImportError::Malformed(_)));

    let err = stores
        .transfer
        .import(&json!({"nodes": "wrong", "edges": []}).to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Schema(_)));
}

#[tokio::test]
async fn schema_violations_are_reported_in_full() {
    let stores = fresh_stores();
    let document = json!({
        "nodes": [
            {
                "id": "n1",
                "position": {"x": 0.0, "y": 0.0},
                "data": {"label": "", "icon": "Mail", "color": "not-a-color"}
            }
        ],
        "edges": [{"id": "e1", "source": "n1", "target": "missing"}]
    });

    let err = stores.transfer.import(&document.to_string()).await.unwrap_err();
    let ImportError::Schema(violations) = err else {
        panic!("expected schema violations");
    };

    let paths: Vec<&str> = violations.violations.iter().map(|v| v.path.as_str()).collect();
    assert!(paths.contains(&"nodes[0].data.label"));
    assert!(paths.contains(&"nodes[0].data.color"));
    assert!(paths.contains(&"edges[0].target"));
}

#[tokio::test]
async fn imported_payloads_are_seeded_and_stripped() {
    let stores = fresh_stores();
    let document = json!({
        "nodes": [
            {
                "id": "n1",
                "position": {"x": 0.0, "y": 0.0},
                "data": {
                    "label": "Exfil",
                    "icon": "Upload",
                    "color": "transparent",
                    "attachments": [{
                        "id": "a1",
                        "type": "image",
                        "name": "dump.png",
                        "data": "data:image/png;base64,DEADBEEF",
                        "createdAt": 1700000000000i64
                    }]
                }
            }
        ],
        "edges": []
    });

    let outcome = stores.transfer.import(&document.to_string()).await.unwrap();

    // Metadata-only in the returned diagram, canonical copy in the blob store
    assert!(outcome.diagram.nodes[0].attachments()[0].data.is_none());
    assert_eq!(
        stores.blob.get("a1").await.unwrap().as_deref(),
        Some("data:image/png;base64,DEADBEEF")
    );
}

#[tokio::test]
async fn payloadless_image_import_keeps_metadata_with_warning() {
    let stores = fresh_stores();
    let document = json!({
        "nodes": [
            {
                "id": "n1",
                "position": {"x": 0.0, "y": 0.0},
                "data": {
                    "label": "Stub",
                    "icon": "Image",
                    "color": "#a855f7",
                    "attachments": [{
                        "id": "a1",
                        "type": "image",
                        "name": "lost.png",
                        "createdAt": 1700000000000i64
                    }]
                }
            }
        ],
        "edges": []
    });

    let outcome = stores.transfer.import(&document.to_string()).await.unwrap();

    assert_eq!(outcome.diagram.nodes[0].attachments().len(), 1);
    assert!(matches!(
        &outcome.warnings[0],
        ImportWarning::MissingImagePayload { attachment_id, .. } if attachment_id == "a1"
    ));
    assert!(stores.blob.get("a1").await.unwrap().is_none());
}

#[tokio::test]
async fn export_preserves_display_only_fields() {
    let stores = fresh_stores();
    let mut node = flow_node("n1", "Styled");
    node.extra
        .insert("width".to_string(), json!(180));
    let diagram = Diagram {
        nodes: vec![node],
        edges: vec![Edge {
            id: "e1".to_string(),
            source: "n1".to_string(),
            target: "n1".to_string(),
            edge_type: Some("smoothstep".to_string()),
            animated: None,
            label: None,
            extra: {
                let mut extra = serde_json::Map::new();
                extra.insert("style".to_string(), json!({"stroke": "#8b5cf6"}));
                extra
            },
        }],
    };

    let document = stores.transfer.export(&diagram).await.unwrap();
    let raw: serde_json::Value = serde_json::from_str(&document).unwrap();

    assert_eq!(raw["nodes"][0]["width"], 180);
    assert_eq!(raw["edges"][0]["type"], "smoothstep");
    assert_eq!(raw["edges"][0]["style"]["stroke"], "#8b5cf6");
}
