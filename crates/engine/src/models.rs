//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory, and they serialise to/from the exchange document
//! (`{ "nodes": [...], "edges": [...] }`) without any mapping layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use nodes::{Branch, NodeData, NodeKind};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Canvas coordinates. Carried through, never read by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Where a node lands when its document entry has no usable position.
    pub const FALLBACK: Position = Position { x: 100.0, y: 100.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::FALLBACK
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    /// What the step does.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    /// Canvas state the engine does not model (`measured`, `selected`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// A node with an explicit id and the default data for its kind.
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            data: NodeData::defaults_for(kind),
            extra: Map::new(),
        }
    }

    /// A freshly placed node with a generated `<kind>-<uuid>` id.
    pub fn place(kind: NodeKind, position: Position) -> Self {
        Self::new(format!("{}-{}", kind, Uuid::new_v4().simple()), kind, position)
    }

    /// Builder-style label override.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = label.into();
        self
    }

    /// Label used in logs and messages: the data label, else the kind name.
    pub fn display_label(&self) -> &str {
        self.data.label_or(self.kind.as_str())
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    /// Which branch of a Condition `source` this edge carries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<Branch>,
    /// Rendering hints such as `animated` or `targetHandle`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// Plain edge with an id derived from its endpoints.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e-{source}-{target}"),
            source,
            target,
            source_handle: None,
            extra: Map::new(),
        }
    }

    /// Plain edge with a generated `edge-<uuid>` id.
    pub fn generated(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: format!("edge-{}", Uuid::new_v4().simple()),
            ..Self::new(source, target)
        }
    }

    /// Edge leaving a Condition node on `branch`.
    pub fn branch(source: impl Into<String>, branch: Branch, target: impl Into<String>) -> Self {
        let mut edge = Self::new(source, target);
        edge.id = format!("e-{}-{}-{}", edge.source, branch.as_str(), edge.target);
        edge.source_handle = Some(branch);
        edge
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow graph.
///
/// Cloning a `Workflow` yields a fully independent value, which is what
/// history snapshots and run-time copies rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Edges leaving `id`, in insertion order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }
}
