//! Import and export of the workflow exchange document.
//!
//! ```json
//! { "nodes": [ { "id", "type", "position": {"x", "y"}, "data": {} } ],
//!   "edges": [ { "id", "source", "target", "sourceHandle": "yes" } ] }
//! ```
//!
//! Import is all-or-nothing: any problem aborts it with a parse error and
//! the caller's graph stays as it was.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::models::{Edge, Node, Position, Workflow};
use crate::EngineError;

/// Parse a document.
///
/// Nodes whose `position` is missing or has non-numeric coordinates are
/// placed at [`Position::FALLBACK`] instead of being rejected. Edges without
/// an id get a generated one. Fields the model does not know are kept and
/// written back out on export.
///
/// # Errors
/// - [`EngineError::InvalidJson`] for unparsable text or malformed entries.
/// - [`EngineError::NotAnObject`] when the root is not an object.
/// - [`EngineError::MissingKey`] when `nodes` or `edges` is absent.
pub fn import_document(text: &str) -> Result<Workflow, EngineError> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Object(mut root) = root else {
        return Err(EngineError::NotAnObject);
    };

    let nodes = take_key(&mut root, "nodes")?;
    let edges = take_key(&mut root, "edges")?;

    let Value::Array(mut nodes) = nodes else {
        return Err(EngineError::InvalidJson(serde::de::Error::custom(
            "`nodes` must be an array",
        )));
    };
    for node in &mut nodes {
        sanitize_position(node);
    }

    let nodes: Vec<Node> = serde_json::from_value(Value::Array(nodes))?;
    let mut edges: Vec<Edge> = serde_json::from_value(edges)?;
    for edge in edges.iter_mut().filter(|e| e.id.trim().is_empty()) {
        edge.id = Edge::generated(&edge.source, &edge.target).id;
    }

    debug!("imported {} nodes and {} edges", nodes.len(), edges.len());
    Ok(Workflow::new(nodes, edges))
}

/// Read and parse a document file.
pub fn import_file(path: &Path) -> Result<Workflow, EngineError> {
    let text = std::fs::read_to_string(path)?;
    import_document(&text)
}

/// Pretty-printed document for `workflow`.
pub fn export_document(workflow: &Workflow) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(workflow)?)
}

/// Download name for an export made at `at`.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("flowforge-workflow-{}.json", at.timestamp_millis())
}

/// Write `workflow` into `dir` under [`export_file_name`] and return the path.
pub fn write_export(dir: &Path, workflow: &Workflow, at: DateTime<Utc>) -> Result<PathBuf, EngineError> {
    let path = dir.join(export_file_name(at));
    std::fs::write(&path, export_document(workflow)?)?;
    info!("exported workflow to {}", path.display());
    Ok(path)
}

fn take_key(root: &mut Map<String, Value>, key: &'static str) -> Result<Value, EngineError> {
    match root.remove(key) {
        Some(Value::Null) | None => Err(EngineError::MissingKey(key)),
        Some(value) => Ok(value),
    }
}

fn sanitize_position(node: &mut Value) {
    let Value::Object(fields) = node else {
        return;
    };
    let usable = fields
        .get("position")
        .and_then(Value::as_object)
        .is_some_and(|p| {
            p.get("x").is_some_and(Value::is_number) && p.get("y").is_some_and(Value::is_number)
        });

    if !usable {
        let fallback = Position::FALLBACK;
        fields.insert(
            "position".to_owned(),
            serde_json::json!({ "x": fallback.x, "y": fallback.y }),
        );
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nodes::{Branch, NodeKind};
    use serde_json::json;

    fn sample() -> Workflow {
        let mut http = Node::new("h", NodeKind::HttpRequest, Position::new(10.0, 20.0));
        http.data.url = Some("https://example.com".into());
        Workflow::new(
            vec![
                Node::new("t", NodeKind::Trigger, Position::new(0.0, 0.0)),
                Node::new("c", NodeKind::Condition, Position::new(5.0, 5.0)),
                http,
                Node::new("e", NodeKind::End, Position::new(30.0, 40.0)),
            ],
            vec![
                Edge::new("t", "c"),
                Edge::branch("c", Branch::Yes, "h"),
                Edge::branch("c", Branch::No, "e"),
                Edge::new("h", "e"),
            ],
        )
    }

    #[test]
    fn export_then_import_preserves_workflow() {
        let workflow = sample();
        let text = export_document(&workflow).unwrap();
        assert!(text.contains("\n  "), "export should be pretty-printed");
        assert!(text.contains("\"sourceHandle\": \"yes\""));
        assert!(text.contains("\"type\": \"httpRequest\""));
        assert_eq!(import_document(&text).unwrap(), workflow);
    }

    #[test]
    fn missing_edges_key_is_rejected() {
        let err = import_document(r#"{ "nodes": [] }"#).unwrap_err();
        assert!(matches!(err, EngineError::MissingKey("edges")));
        assert!(err.is_parse_error());

        let err = import_document(r#"{ "edges": [] }"#).unwrap_err();
        assert!(matches!(err, EngineError::MissingKey("nodes")));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            import_document("not json at all"),
            Err(EngineError::InvalidJson(_))
        ));
        assert!(matches!(import_document("[1, 2]"), Err(EngineError::NotAnObject)));
        assert!(matches!(
            import_document(r#"{ "nodes": {}, "edges": [] }"#),
            Err(EngineError::InvalidJson(_))
        ));
        assert!(matches!(
            import_document(r#"{ "nodes": [{ "id": "x", "type": "teleport" }], "edges": [] }"#),
            Err(EngineError::InvalidJson(_))
        ));
    }

    #[test]
    fn node_without_position_gets_fallback() {
        let doc = json!({
            "nodes": [
                { "id": "t", "type": "trigger", "data": { "label": "Start", "triggerType": "manual" } },
                { "id": "a", "type": "action", "position": { "x": "left", "y": 3 }, "data": { "label": "Do" } },
                { "id": "e", "type": "end", "position": { "x": 7.5, "y": 8 }, "data": { "label": "End" } }
            ],
            "edges": [ { "id": "e1", "source": "t", "target": "a" } ]
        });
        let workflow = import_document(&doc.to_string()).unwrap();

        let start = workflow.node("t").unwrap();
        assert_eq!(start.position, Position::FALLBACK);
        assert_eq!(start.kind, NodeKind::Trigger);
        assert_eq!(start.data.label, "Start");
        assert_eq!(start.data.trigger_type.as_deref(), Some("manual"));

        assert_eq!(workflow.node("a").unwrap().position, Position::new(100.0, 100.0));
        assert_eq!(workflow.node("e").unwrap().position, Position::new(7.5, 8.0));
        assert_eq!(workflow.edges[0].source_handle, None);
    }

    #[test]
    fn canvas_fields_survive_import_and_export() {
        let doc = json!({
            "nodes": [{
                "id": "t",
                "type": "trigger",
                "position": { "x": 10, "y": 20 },
                "data": { "label": "Start" },
                "measured": { "width": 150, "height": 40 },
                "selected": true
            }],
            "edges": [{
                "id": "e1",
                "source": "t",
                "target": "t",
                "animated": true,
                "targetHandle": null
            }]
        });
        let workflow = import_document(&doc.to_string()).unwrap();
        assert_eq!(workflow.nodes[0].extra["selected"], json!(true));
        assert_eq!(workflow.edges[0].extra["animated"], json!(true));

        let exported: Value = serde_json::from_str(&export_document(&workflow).unwrap()).unwrap();
        let node = &exported["nodes"][0];
        assert_eq!(node["measured"], json!({ "width": 150, "height": 40 }));
        assert_eq!(node["selected"], json!(true));
        let edge = &exported["edges"][0];
        assert_eq!(edge["animated"], json!(true));
        assert!(edge.as_object().unwrap().contains_key("targetHandle"));
        assert_eq!(edge["id"], json!("e1"));
    }

    #[test]
    fn edges_without_id_get_distinct_generated_ids() {
        let doc = json!({
            "nodes": [
                { "id": "t", "type": "trigger" },
                { "id": "e", "type": "end" }
            ],
            "edges": [
                { "source": "t", "target": "e" },
                { "id": "", "source": "t", "target": "e" },
                { "id": "kept", "source": "t", "target": "e" }
            ]
        });
        let workflow = import_document(&doc.to_string()).unwrap();
        let ids: Vec<&str> = workflow.edges.iter().map(|e| e.id.as_str()).collect();

        assert!(ids[0].starts_with("edge-"));
        assert!(ids[1].starts_with("edge-"));
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[2], "kept");
    }

    #[test]
    fn export_file_name_uses_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(export_file_name(at), "flowforge-workflow-1700000000123.json");
    }

    #[test]
    fn write_export_creates_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.timestamp_millis_opt(42).unwrap();
        let path = write_export(dir.path(), &sample(), at).unwrap();

        assert_eq!(path.file_name().unwrap(), "flowforge-workflow-42.json");
        assert_eq!(import_file(&path).unwrap(), sample());
    }
}
