//! Diagram Document Schema
//!
//! Self-contained validation of untrusted diagram documents. The validator
//! walks the raw JSON and collects **every** violation with its field path,
//! so callers can present a complete diagnostic instead of the first failure.
//! It is side-effect free and never touches a store.
//!
//! Unsafe link URLs are deliberately not fatal: they are reported through a
//! separate channel (`DocumentReport::unsafe_links`) so the import pipeline
//! can drop the offending attachments while keeping the rest of the
//! document. The same scheme allowlist is applied a second time during
//! import sanitization; keep both call sites.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::models::Diagram;

/// Size and format ceilings for diagram documents
pub mod limits {
    /// Node count ceiling per document
    pub const MAX_NODES: usize = 1000;
    /// Edge count ceiling per document
    pub const MAX_EDGES: usize = 5000;
    /// Node label length
    pub const MAX_LABEL_LEN: usize = 100;
    /// Icon reference length
    pub const MAX_ICON_LEN: usize = 50;
    /// Node description length
    pub const MAX_DESCRIPTION_LEN: usize = 500;
    /// Attachment id length
    pub const MAX_ATTACHMENT_ID_LEN: usize = 100;
    /// Attachment display name length
    pub const MAX_ATTACHMENT_NAME_LEN: usize = 200;
    /// Link URL length
    pub const MAX_URL_LEN: usize = 2048;
    /// Attachments per node
    pub const MAX_ATTACHMENTS_PER_NODE: usize = 20;
    /// Presentation order slots
    pub const MAX_PRESENTATION_ORDER: i64 = 1000;
    /// URL schemes accepted on link attachments
    pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];
}

static HEX_COLOR: OnceLock<Regex> = OnceLock::new();

fn hex_color() -> &'static Regex {
    HEX_COLOR.get_or_init(|| Regex::new("^#[0-9A-Fa-f]{6}$").expect("valid hex color pattern"))
}

/// Whether a color value is acceptable: strict hex RGB or the transparent
/// sentinel used by the editor for invisible grouping nodes.
pub fn is_valid_color(value: &str) -> bool {
    value == "transparent" || hex_color().is_match(value)
}

/// Whether a URL parses and carries an allowlisted scheme.
///
/// This predicate is the single source of truth for link safety; it is
/// invoked by the validator, by the import sanitizer, and by the attachment
/// lifecycle when links are added directly from the editor.
pub fn is_safe_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => limits::ALLOWED_URL_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

/// A single violated constraint, anchored to its JSON path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The full set of violations found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolations {
    pub violations: Vec<SchemaViolation>,
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "document failed validation ({} violations):", self.violations.len())?;
        for violation in &self.violations {
            writeln!(f, "  - {}", violation)?;
        }
        Ok(())
    }
}

impl Error for SchemaViolations {}

/// A link attachment whose URL failed the scheme allowlist.
///
/// Non-fatal: reported alongside the validated document so the caller can
/// drop the attachment and keep the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsafeLink {
    pub node_id: String,
    pub attachment_id: String,
    pub url: String,
}

/// Validation result: the typed document plus any unsafe links found
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub diagram: Diagram,
    pub unsafe_links: Vec<UnsafeLink>,
}

struct Checker {
    violations: Vec<SchemaViolation>,
    unsafe_links: Vec<UnsafeLink>,
    attachment_ids: Vec<String>,
}

impl Checker {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(SchemaViolation {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate an untrusted document against the diagram schema.
///
/// Returns the typed `Diagram` (plus unsafe-link flags) when the document is
/// structurally sound, or the complete list of violations otherwise.
///
/// # Examples
///
/// ```rust
/// use attackflow_core::schema::validate_document;
/// use serde_json::json;
///
/// let report = validate_document(&json!({"nodes": [], "edges": []})).unwrap();
/// assert!(report.diagram.nodes.is_empty());
///
/// let err = validate_document(&json!({"nodes": "nope", "edges": []})).unwrap_err();
/// assert_eq!(err.violations.len(), 1);
/// ```
pub fn validate_document(raw: &Value) -> Result<DocumentReport, SchemaViolations> {
    let mut checker = Checker {
        violations: Vec::new(),
        unsafe_links: Vec::new(),
        attachment_ids: Vec::new(),
    };

    let Some(root) = raw.as_object() else {
        checker.push("$", "document must be a JSON object");
        return Err(SchemaViolations { violations: checker.violations });
    };

    let mut node_ids = Vec::new();
    match root.get("nodes").and_then(Value::as_array) {
        Some(nodes) => {
            if nodes.len() > limits::MAX_NODES {
                checker.push(
                    "nodes",
                    format!("too many nodes ({}, max {})", nodes.len(), limits::MAX_NODES),
                );
            }
            for (index, node) in nodes.iter().enumerate() {
                check_node(&mut checker, index, node, &mut node_ids);
            }
        }
        None => checker.push("nodes", "missing or not an array"),
    }

    check_duplicates(&mut checker, "nodes", "node id", &node_ids);
    let attachment_ids = std::mem::take(&mut checker.attachment_ids);
    check_duplicates(&mut checker, "nodes", "attachment id", &attachment_ids);

    match root.get("edges").and_then(Value::as_array) {
        Some(edges) => {
            if edges.len() > limits::MAX_EDGES {
                checker.push(
                    "edges",
                    format!("too many edges ({}, max {})", edges.len(), limits::MAX_EDGES),
                );
            }
            for (index, edge) in edges.iter().enumerate() {
                check_edge(&mut checker, index, edge, &node_ids);
            }
        }
        None => checker.push("edges", "missing or not an array"),
    }

    if !checker.violations.is_empty() {
        return Err(SchemaViolations { violations: checker.violations });
    }

    // The walk above guarantees the shape, so this conversion only fails on
    // a constraint the checks missed; surface that as a violation too.
    match serde_json::from_value::<Diagram>(raw.clone()) {
        Ok(diagram) => Ok(DocumentReport {
            diagram,
            unsafe_links: checker.unsafe_links,
        }),
        Err(e) => Err(SchemaViolations {
            violations: vec![SchemaViolation {
                path: "$".to_string(),
                message: format!("document does not deserialize: {}", e),
            }],
        }),
    }
}

fn check_node(checker: &mut Checker, index: usize, node: &Value, node_ids: &mut Vec<String>) {
    let path = format!("nodes[{}]", index);
    let Some(obj) = node.as_object() else {
        checker.push(path, "node must be an object");
        return;
    };

    let node_id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => {
            node_ids.push(id.to_string());
            id.to_string()
        }
        _ => {
            checker.push(format!("{}.id", path), "missing or empty node id");
            String::new()
        }
    };

    match obj.get("position").and_then(Value::as_object) {
        Some(position) => {
            for axis in ["x", "y"] {
                match position.get(axis).and_then(Value::as_f64) {
                    Some(value) if value.is_finite() => {}
                    _ => checker.push(
                        format!("{}.position.{}", path, axis),
                        "must be a finite number",
                    ),
                }
            }
        }
        None => checker.push(format!("{}.position", path), "missing position object"),
    }

    let Some(data) = obj.get("data").and_then(Value::as_object) else {
        checker.push(format!("{}.data", path), "missing data object");
        return;
    };
    let data_path = format!("{}.data", path);

    check_str_field(checker, &data_path, data, "label", 1, limits::MAX_LABEL_LEN);
    check_str_field(checker, &data_path, data, "icon", 1, limits::MAX_ICON_LEN);

    match data.get("color").and_then(Value::as_str) {
        Some(color) if is_valid_color(color) => {}
        Some(color) => checker.push(
            format!("{}.color", data_path),
            format!("invalid color {:?} (expected #rrggbb or \"transparent\")", color),
        ),
        None => checker.push(format!("{}.color", data_path), "missing color"),
    }

    if let Some(description) = data.get("description") {
        match description.as_str() {
            Some(text) if text.chars().count() <= limits::MAX_DESCRIPTION_LEN => {}
            Some(_) => checker.push(
                format!("{}.description", data_path),
                format!("longer than {} characters", limits::MAX_DESCRIPTION_LEN),
            ),
            None => checker.push(format!("{}.description", data_path), "must be a string"),
        }
    }

    if let Some(order) = data.get("presentationOrder") {
        match order.as_i64() {
            Some(value) if value >= 1 && value <= limits::MAX_PRESENTATION_ORDER => {}
            _ => checker.push(
                format!("{}.presentationOrder", data_path),
                format!("must be an integer in 1..={}", limits::MAX_PRESENTATION_ORDER),
            ),
        }
    }

    if let Some(attachments) = data.get("attachments") {
        let Some(list) = attachments.as_array() else {
            checker.push(format!("{}.attachments", data_path), "must be an array");
            return;
        };
        if list.len() > limits::MAX_ATTACHMENTS_PER_NODE {
            checker.push(
                format!("{}.attachments", data_path),
                format!(
                    "too many attachments ({}, max {})",
                    list.len(),
                    limits::MAX_ATTACHMENTS_PER_NODE
                ),
            );
        }
        for (att_index, attachment) in list.iter().enumerate() {
            let att_path = format!("{}.attachments[{}]", data_path, att_index);
            check_attachment(checker, &att_path, &node_id, attachment);
        }
    }
}

fn check_attachment(checker: &mut Checker, path: &str, node_id: &str, attachment: &Value) {
    let Some(obj) = attachment.as_object() else {
        checker.push(path.to_string(), "attachment must be an object");
        return;
    };

    let attachment_id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() && id.chars().count() <= limits::MAX_ATTACHMENT_ID_LEN => {
            checker.attachment_ids.push(id.to_string());
            id.to_string()
        }
        _ => {
            checker.push(
                format!("{}.id", path),
                format!("missing, empty or longer than {} characters", limits::MAX_ATTACHMENT_ID_LEN),
            );
            String::new()
        }
    };

    check_str_field(checker, path, obj, "name", 1, limits::MAX_ATTACHMENT_NAME_LEN);

    match obj.get("createdAt").and_then(Value::as_i64) {
        Some(ts) if ts > 0 => {}
        _ => checker.push(format!("{}.createdAt", path), "must be a positive integer timestamp"),
    }

    let kind = obj.get("type").and_then(Value::as_str);
    match kind {
        Some("link") => {
            match obj.get("url").and_then(Value::as_str) {
                Some(url) if url.chars().count() <= limits::MAX_URL_LEN => {
                    if !is_safe_url(url) {
                        // Not fatal: flagged for the import pipeline to drop.
                        checker.unsafe_links.push(UnsafeLink {
                            node_id: node_id.to_string(),
                            attachment_id,
                            url: url.to_string(),
                        });
                    }
                }
                Some(_) => checker.push(
                    format!("{}.url", path),
                    format!("longer than {} characters", limits::MAX_URL_LEN),
                ),
                None => checker.push(format!("{}.url", path), "link attachment requires a url"),
            }
        }
        Some("image") => {
            if let Some(data) = obj.get("data") {
                if !data.is_string() {
                    checker.push(format!("{}.data", path), "image payload must be a string");
                }
            }
        }
        Some(other) => checker.push(
            format!("{}.type", path),
            format!("unknown attachment type {:?}", other),
        ),
        None => checker.push(format!("{}.type", path), "missing attachment type"),
    }
}

fn check_edge(checker: &mut Checker, index: usize, edge: &Value, node_ids: &[String]) {
    let path = format!("edges[{}]", index);
    let Some(obj) = edge.as_object() else {
        checker.push(path, "edge must be an object");
        return;
    };

    match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => {}
        _ => checker.push(format!("{}.id", path), "missing or empty edge id"),
    }

    for endpoint in ["source", "target"] {
        match obj.get(endpoint).and_then(Value::as_str) {
            Some(id) if !id.is_empty() => {
                if !node_ids.iter().any(|n| n == id) {
                    checker.push(
                        format!("{}.{}", path, endpoint),
                        format!("references unknown node {:?}", id),
                    );
                }
            }
            _ => checker.push(format!("{}.{}", path, endpoint), "missing or empty node reference"),
        }
    }
}

fn check_str_field(
    checker: &mut Checker,
    parent: &str,
    obj: &serde_json::Map<String, Value>,
    key: &str,
    min: usize,
    max: usize,
) {
    match obj.get(key).and_then(Value::as_str) {
        Some(value) => {
            let len = value.chars().count();
            if len < min || len > max {
                checker.push(
                    format!("{}.{}", parent, key),
                    format!("length must be in {}..={} characters", min, max),
                );
            }
        }
        None => checker.push(format!("{}.{}", parent, key), "missing or not a string"),
    }
}

fn check_duplicates(checker: &mut Checker, path: &str, what: &str, ids: &[String]) {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            checker.push(path.to_string(), format!("duplicate {} {:?}", what, id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_node(id: &str) -> Value {
        json!({
            "id": id,
            "position": {"x": 0.0, "y": 0.0},
            "data": {"label": "Recon", "icon": "Search", "color": "#3b82f6"}
        })
    }

    #[test]
    fn accepts_minimal_document() {
        let doc = json!({"nodes": [minimal_node("n1")], "edges": []});
        let report = validate_document(&doc).unwrap();
        assert_eq!(report.diagram.nodes.len(), 1);
        assert!(report.unsafe_links.is_empty());
    }

    #[test]
    fn collects_every_violation_with_paths() {
        let doc = json!({
            "nodes": [{
                "id": "",
                "position": {"x": 0.0},
                "data": {"label": "", "icon": "Mail", "color": "red"}
            }],
            "edges": [{"id": "e1", "source": "ghost", "target": ""}]
        });

        let err = validate_document(&doc).unwrap_err();
        let paths: Vec<&str> = err.violations.iter().map(|v| v.path.as_str()).collect();

        assert!(paths.contains(&"nodes[0].id"));
        assert!(paths.contains(&"nodes[0].position.y"));
        assert!(paths.contains(&"nodes[0].data.label"));
        assert!(paths.contains(&"nodes[0].data.color"));
        assert!(paths.contains(&"edges[0].source"));
        assert!(paths.contains(&"edges[0].target"));
        assert!(err.violations.len() >= 6);
    }

    #[test]
    fn rejects_node_count_over_ceiling() {
        let nodes: Vec<Value> = (0..limits::MAX_NODES + 1)
            .map(|i| minimal_node(&format!("n{}", i)))
            .collect();
        let doc = json!({"nodes": nodes, "edges": []});

        let err = validate_document(&doc).unwrap_err();
        assert!(err.violations.iter().any(|v| v.path == "nodes"));
    }

    #[test]
    fn transparent_color_is_accepted() {
        assert!(is_valid_color("transparent"));
        assert!(is_valid_color("#A1b2C3"));
        assert!(!is_valid_color("#fff"));
        assert!(!is_valid_color("blue"));
    }

    #[test]
    fn unsafe_scheme_is_flagged_not_fatal() {
        let mut node = minimal_node("n1");
        node["data"]["attachments"] = json!([{
            "id": "a1",
            "type": "link",
            "name": "evil",
            "url": "javascript:alert(1)",
            "createdAt": 1700000000000i64
        }]);
        let doc = json!({"nodes": [node], "edges": []});

        let report = validate_document(&doc).unwrap();
        assert_eq!(report.unsafe_links.len(), 1);
        assert_eq!(report.unsafe_links[0].attachment_id, "a1");
        assert_eq!(report.unsafe_links[0].node_id, "n1");
    }

    #[test]
    fn duplicate_node_ids_are_violations() {
        let doc = json!({"nodes": [minimal_node("n1"), minimal_node("n1")], "edges": []});
        let err = validate_document(&doc).unwrap_err();
        assert!(err.violations.iter().any(|v| v.message.contains("duplicate node id")));
    }

    #[test]
    fn edge_to_existing_node_passes() {
        let doc = json!({
            "nodes": [minimal_node("a"), minimal_node("b")],
            "edges": [{"id": "e1", "source": "a", "target": "b", "animated": true}]
        });
        let report = validate_document(&doc).unwrap();
        assert_eq!(report.diagram.edges.len(), 1);
    }

    #[test]
    fn duplicate_attachment_ids_across_nodes_are_violations() {
        let mut a = minimal_node("a");
        let mut b = minimal_node("b");
        let attachment = json!([{
            "id": "att-1",
            "type": "link",
            "name": "docs",
            "url": "https://example.com",
            "createdAt": 1700000000000i64
        }]);
        a["data"]["attachments"] = attachment.clone();
        b["data"]["attachments"] = attachment;
        let doc = json!({"nodes": [a, b], "edges": []});

        let err = validate_document(&doc).unwrap_err();
        assert!(err.violations.iter().any(|v| v.message.contains("duplicate attachment id")));
    }

    #[test]
    fn scheme_allowlist() {
        assert!(is_safe_url("https://example.com/a"));
        assert!(is_safe_url("http://example.com"));
        assert!(is_safe_url("mailto:ops@example.com"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("data:text/html,hi"));
        assert!(!is_safe_url("not a url"));
    }
}
