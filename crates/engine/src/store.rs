//! The host-side state container.
//!
//! `WorkflowStore` is the single owner of the live workflow. Readers go
//! through [`WorkflowStore::get`], observers register with
//! [`WorkflowStore::subscribe`], and every user gesture goes through a
//! method that records one undo snapshot before changing anything.

use std::collections::HashSet;

use tracing::{debug, info};

use nodes::{Branch, NodeData};

use crate::document::import_document;
use crate::history::History;
use crate::models::{Edge, Node, Position, Workflow};
use crate::EngineError;

/// Handle returned by [`WorkflowStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&Workflow)>;

/// Owns the workflow, its undo history and its observers.
#[derive(Default)]
pub struct WorkflowStore {
    workflow: Workflow,
    history: History,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl WorkflowStore {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            workflow,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // get / set / subscribe
    // ------------------------------------------------------------------

    pub fn get(&self) -> &Workflow {
        &self.workflow
    }

    /// Replace the workflow without recording an undo step.
    ///
    /// The history is cleared as well, so `undo` cannot step back across the
    /// replacement.
    pub fn set(&mut self, workflow: Workflow) {
        self.workflow = workflow;
        self.history.clear();
        self.notify();
    }

    /// Call `listener` after every change from now on.
    pub fn subscribe(&mut self, listener: impl Fn(&Workflow) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ------------------------------------------------------------------
    // Undoable gestures
    // ------------------------------------------------------------------

    /// Add a node. Returns its id.
    pub fn add_node(&mut self, node: Node) -> String {
        let id = node.id.clone();
        self.record(|wf| wf.nodes.push(node));
        id
    }

    /// Place a new node of `kind` with default data and a generated id.
    pub fn place_node(&mut self, kind: nodes::NodeKind, position: Position) -> String {
        self.add_node(Node::place(kind, position))
    }

    /// Edit a node's data in place. Returns `false` (and records nothing)
    /// when no node has that id.
    pub fn update_node_data(&mut self, id: &str, edit: impl FnOnce(&mut NodeData)) -> bool {
        if self.workflow.node(id).is_none() {
            return false;
        }
        self.record(|wf| {
            if let Some(node) = wf.node_mut(id) {
                edit(&mut node.data);
            }
        });
        true
    }

    /// Move a node on the canvas.
    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        if self.workflow.node(id).is_none() {
            return false;
        }
        self.record(|wf| {
            if let Some(node) = wf.node_mut(id) {
                node.position = position;
            }
        });
        true
    }

    /// Delete nodes together with every edge touching them. Returns how many
    /// nodes were removed.
    pub fn remove_nodes(&mut self, ids: &[&str]) -> usize {
        let doomed: HashSet<&str> = ids.iter().copied().collect();
        let count = self
            .workflow
            .nodes
            .iter()
            .filter(|n| doomed.contains(n.id.as_str()))
            .count();
        if count == 0 {
            return 0;
        }

        self.record(|wf| {
            wf.nodes.retain(|n| !doomed.contains(n.id.as_str()));
            wf.edges.retain(|e| {
                !doomed.contains(e.source.as_str()) && !doomed.contains(e.target.as_str())
            });
        });
        count
    }

    /// Connect two nodes. Returns the generated edge id.
    pub fn connect(&mut self, source: &str, target: &str, handle: Option<Branch>) -> String {
        let edge = Edge {
            source_handle: handle,
            ..Edge::generated(source, target)
        };
        let id = edge.id.clone();
        self.record(|wf| wf.edges.push(edge));
        id
    }

    /// Delete edges by id. Returns how many were removed.
    pub fn remove_edges(&mut self, ids: &[&str]) -> usize {
        let doomed: HashSet<&str> = ids.iter().copied().collect();
        let count = self
            .workflow
            .edges
            .iter()
            .filter(|e| doomed.contains(e.id.as_str()))
            .count();
        if count > 0 {
            self.record(|wf| wf.edges.retain(|e| !doomed.contains(e.id.as_str())));
        }
        count
    }

    /// Empty the canvas.
    pub fn clear(&mut self) {
        if !self.workflow.is_empty() {
            self.record(|wf| *wf = Workflow::default());
        }
    }

    /// Replace the workflow with a parsed document.
    ///
    /// # Errors
    /// Any parse error from [`import_document`]; the workflow and history
    /// are left untouched in that case.
    pub fn import_document(&mut self, text: &str) -> Result<(), EngineError> {
        let imported = import_document(text)?;
        info!(
            "imported workflow with {} nodes and {} edges",
            imported.nodes.len(),
            imported.edges.len()
        );
        self.record(|wf| *wf = imported);
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let applied = self.history.undo(&mut self.workflow);
        if applied {
            self.notify();
        }
        applied
    }

    pub fn redo(&mut self) -> bool {
        let applied = self.history.redo(&mut self.workflow);
        if applied {
            self.notify();
        }
        applied
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    /// Snapshot, apply one mutation, notify.
    fn record(&mut self, mutate: impl FnOnce(&mut Workflow)) {
        self.history.snapshot(&self.workflow);
        mutate(&mut self.workflow);
        debug!(
            nodes = self.workflow.nodes.len(),
            edges = self.workflow.edges.len(),
            "workflow changed"
        );
        self.notify();
    }

    fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.workflow);
        }
    }
}

impl std::fmt::Debug for WorkflowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStore")
            .field("workflow", &self.workflow)
            .field("history", &self.history)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use nodes::NodeKind;

    fn store_with_trigger() -> WorkflowStore {
        WorkflowStore::new(Workflow::new(
            vec![Node::new("t", NodeKind::Trigger, Position::new(0.0, 0.0))],
            Vec::new(),
        ))
    }

    #[test]
    fn gestures_are_undoable_one_at_a_time() {
        let mut store = store_with_trigger();
        let original = store.get().clone();

        let action = store.place_node(NodeKind::Action, Position::new(10.0, 0.0));
        assert!(action.starts_with("action-"));
        store.connect("t", &action, None);
        store.update_node_data(&action, |d| d.label = "Send report".into());
        let edited = store.get().clone();

        assert_eq!(store.history().undo_depth(), 3);
        assert!(store.undo());
        assert_eq!(store.get().node(&action).unwrap().data.label, "Action");
        assert!(store.undo());
        assert!(store.undo());
        assert!(!store.undo());
        assert_eq!(store.get(), &original);

        while store.redo() {}
        assert_eq!(store.get(), &edited);
    }

    #[test]
    fn removing_a_node_drops_its_edges() {
        let mut store = store_with_trigger();
        store.add_node(Node::new("a", NodeKind::Action, Position::default()));
        store.add_node(Node::new("e", NodeKind::End, Position::default()));
        store.connect("t", "a", None);
        store.connect("a", "e", None);

        assert_eq!(store.remove_nodes(&["a"]), 1);
        assert!(store.get().node("a").is_none());
        assert!(store.get().edges.is_empty());

        store.undo();
        assert_eq!(store.get().edges.len(), 2);
    }

    #[test]
    fn missing_targets_record_nothing() {
        let mut store = store_with_trigger();
        assert!(!store.update_node_data("ghost", |d| d.label.clear()));
        assert!(!store.move_node("ghost", Position::new(1.0, 1.0)));
        assert_eq!(store.remove_nodes(&["ghost"]), 0);
        assert_eq!(store.remove_edges(&["nope"]), 0);
        assert!(!store.can_undo());
    }

    #[test]
    fn failed_import_leaves_state_alone() {
        let mut store = store_with_trigger();
        let before = store.get().clone();

        let err = store.import_document(r#"{ "nodes": [] }"#).unwrap_err();
        assert!(err.is_parse_error());
        assert_eq!(store.get(), &before);
        assert!(!store.can_undo());

        store
            .import_document(r#"{ "nodes": [{ "id": "x", "type": "end" }], "edges": [] }"#)
            .unwrap();
        assert_eq!(store.get().nodes[0].position, Position::FALLBACK);
        assert!(store.undo());
        assert_eq!(store.get(), &before);
    }

    #[test]
    fn subscribers_see_every_change_until_unsubscribed() {
        let mut store = store_with_trigger();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = store.subscribe(move |wf| sink.borrow_mut().push(wf.nodes.len()));

        store.place_node(NodeKind::End, Position::default());
        store.undo();
        store.set(Workflow::default());
        assert_eq!(*seen.borrow(), vec![2, 1, 0]);
        assert!(!store.can_redo());

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.place_node(NodeKind::End, Position::default());
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn set_is_a_history_boundary() {
        let mut store = store_with_trigger();
        store.place_node(NodeKind::Action, Position::default());
        store.place_node(NodeKind::End, Position::default());
        assert_eq!(store.history().undo_depth(), 2);

        let replacement = Workflow::new(
            vec![Node::new("x", NodeKind::Trigger, Position::default())],
            Vec::new(),
        );
        store.set(replacement.clone());

        assert!(!store.can_undo());
        assert!(!store.undo());
        assert_eq!(store.get(), &replacement);

        store.place_node(NodeKind::End, Position::default());
        assert!(store.undo());
        assert_eq!(store.get(), &replacement);
        assert!(!store.undo());
    }

    #[test]
    fn connect_generates_unique_edge_ids() {
        let mut store = store_with_trigger();
        store.add_node(Node::new("e", NodeKind::End, Position::default()));
        let first = store.connect("t", "e", None);
        let second = store.connect("t", "e", None);

        assert!(first.starts_with("edge-"));
        assert_ne!(first, second);
        assert_eq!(store.remove_edges(&[first.as_str()]), 1);
        assert_eq!(store.get().edges[0].id, second);
    }

    #[test]
    fn clear_and_move_are_recorded() {
        let mut store = store_with_trigger();
        assert!(store.move_node("t", Position::new(5.0, 6.0)));
        store.clear();
        assert!(store.get().is_empty());

        store.undo();
        assert_eq!(store.get().nodes[0].position, Position::new(5.0, 6.0));
        store.undo();
        assert_eq!(store.get().nodes[0].position, Position::new(0.0, 0.0));
    }
}
