//! Graph algorithms over a workflow's nodes and edges.
//!
//! - [`build_adjacency`]: ordered successor lists.
//! - [`detect_cycle`]: DFS with a recursion stack.
//! - [`execution_sequence`]: DFS postorder rooted at Trigger nodes first.
//!
//! All three are deterministic for a given node and edge order, and all of
//! them use explicit stacks so arbitrarily deep graphs are safe.

use std::collections::{HashMap, HashSet};

use nodes::NodeKind;

use crate::models::{Edge, Node};

/// Node id → target ids, in edge insertion order.
///
/// Every node gets an entry, even without outgoing edges. Edges whose source
/// is not a known node are ignored; targets are kept as written, so a
/// dangling target still shows up in traversals.
pub fn build_adjacency<'a>(nodes: &'a [Node], edges: &'a [Edge]) -> HashMap<&'a str, Vec<&'a str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = nodes
        .iter()
        .map(|n| (n.id.as_str(), Vec::new()))
        .collect();

    for edge in edges {
        if let Some(targets) = adjacency.get_mut(edge.source.as_str()) {
            targets.push(edge.target.as_str());
        }
    }

    adjacency
}

/// `true` when the directed graph contains a cycle among its nodes.
///
/// Depth-first search from each unvisited node in array order, tracking the
/// current recursion stack; reaching a node already on the stack is a
/// back-edge. O(V+E).
pub fn detect_cycle(nodes: &[Node], edges: &[Edge]) -> bool {
    let adjacency = build_adjacency(nodes, edges);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    for root in nodes {
        let root = root.id.as_str();
        if visited.contains(root) {
            continue;
        }

        // (node, index of the next successor to look at)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        visited.insert(root);
        on_stack.insert(root);

        while let Some((node, next)) = stack.last_mut() {
            let successors = adjacency.get(*node).map(Vec::as_slice).unwrap_or_default();

            match successors.get(*next) {
                Some(&neighbour) => {
                    *next += 1;
                    if on_stack.contains(neighbour) {
                        return true;
                    }
                    if visited.insert(neighbour) {
                        on_stack.insert(neighbour);
                        stack.push((neighbour, 0));
                    }
                }
                None => {
                    on_stack.remove(*node);
                    stack.pop();
                }
            }
        }
    }

    false
}

/// Order in which a run visits nodes.
///
/// DFS postorder, reversed: a node is placed in front of everything reached
/// from it. Roots are every Trigger node in array order, then any node still
/// unvisited in array order, so disconnected parts are covered too.
///
/// For an acyclic graph every edge `u → v` has `u` before `v`. On a cyclic
/// graph the walk still terminates but the order is not a linearisation;
/// callers reject cycles through validation first.
pub fn execution_sequence(nodes: &[Node], edges: &[Edge]) -> Vec<String> {
    let adjacency = build_adjacency(nodes, edges);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut postorder: Vec<&str> = Vec::with_capacity(nodes.len());

    let roots = nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Trigger)
        .chain(nodes.iter().filter(|n| n.kind != NodeKind::Trigger))
        .map(|n| n.id.as_str());

    for root in roots {
        if !visited.insert(root) {
            continue;
        }

        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some((node, next)) = stack.last_mut() {
            let successors = adjacency.get(*node).map(Vec::as_slice).unwrap_or_default();

            match successors.get(*next) {
                Some(&neighbour) => {
                    *next += 1;
                    if visited.insert(neighbour) {
                        stack.push((neighbour, 0));
                    }
                }
                None => {
                    postorder.push(*node);
                    stack.pop();
                }
            }
        }
    }

    postorder.into_iter().rev().map(str::to_owned).collect()
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    fn make_node(id: &str, kind: NodeKind) -> Node {
        Node::new(id, kind, Position::default())
    }

    fn actions(ids: &[&str]) -> Vec<Node> {
        ids.iter().map(|id| make_node(id, NodeKind::Action)).collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<Edge> {
        pairs.iter().map(|(s, t)| Edge::new(*s, *t)).collect()
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).expect("id in order")
    }

    #[test]
    fn adjacency_preserves_edge_order_and_ignores_unknown_sources() {
        let nodes = actions(&["a", "b", "c"]);
        let edges = edges(&[("a", "c"), ("ghost", "a"), ("a", "b"), ("b", "missing")]);
        let adjacency = build_adjacency(&nodes, &edges);

        assert_eq!(adjacency["a"], vec!["c", "b"]);
        assert_eq!(adjacency["b"], vec!["missing"]);
        assert!(adjacency["c"].is_empty());
        assert!(!adjacency.contains_key("ghost"));
    }

    #[test]
    fn no_cycle_in_linear_chain() {
        let nodes = actions(&["a", "b", "c"]);
        assert!(!detect_cycle(&nodes, &edges(&[("a", "b"), ("b", "c")])));
    }

    #[test]
    fn cycle_is_detected() {
        // A → B → C → A
        let nodes = actions(&["a", "b", "c"]);
        let edges = edges(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(detect_cycle(&nodes, &edges));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let nodes = actions(&["a"]);
        assert!(detect_cycle(&nodes, &edges(&[("a", "a")])));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        //   A
        //  / \
        // B   C
        //  \ /
        //   D
        let nodes = actions(&["a", "b", "c", "d"]);
        let edges = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert!(!detect_cycle(&nodes, &edges));
    }

    #[test]
    fn cycle_in_a_disconnected_component_is_found() {
        let nodes = actions(&["a", "b", "x", "y"]);
        let edges = edges(&[("a", "b"), ("x", "y"), ("y", "x")]);
        assert!(detect_cycle(&nodes, &edges));
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let ids: Vec<String> = (0..50_000).map(|i| format!("n{i}")).collect();
        let nodes: Vec<Node> = ids.iter().map(|id| make_node(id, NodeKind::Action)).collect();
        let edges: Vec<Edge> = ids.windows(2).map(|w| Edge::new(&w[0], &w[1])).collect();

        assert!(!detect_cycle(&nodes, &edges));
        let order = execution_sequence(&nodes, &edges);
        assert_eq!(order.len(), ids.len());
        assert_eq!(order.first().map(String::as_str), Some("n0"));
    }

    #[test]
    fn sequence_starts_from_trigger() {
        // Trigger listed last still comes first.
        let nodes = vec![
            make_node("c", NodeKind::End),
            make_node("b", NodeKind::Action),
            make_node("a", NodeKind::Trigger),
        ];
        let order = execution_sequence(&nodes, &edges(&[("a", "b"), ("b", "c")]));
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn sequence_respects_every_edge_in_a_dag() {
        let nodes = vec![
            make_node("t", NodeKind::Trigger),
            make_node("a", NodeKind::Action),
            make_node("b", NodeKind::Action),
            make_node("c", NodeKind::Action),
            make_node("d", NodeKind::End),
            make_node("lonely", NodeKind::Action),
        ];
        let edges = edges(&[("t", "a"), ("t", "b"), ("a", "c"), ("b", "c"), ("c", "d"), ("a", "d")]);
        let order = execution_sequence(&nodes, &edges);

        assert_eq!(order.len(), nodes.len());
        let unique: HashSet<&String> = order.iter().collect();
        assert_eq!(unique.len(), nodes.len());
        for edge in &edges {
            assert!(
                position(&order, &edge.source) < position(&order, &edge.target),
                "{} should precede {}",
                edge.source,
                edge.target
            );
        }
    }

    #[test]
    fn disconnected_nodes_follow_array_order() {
        let nodes = actions(&["x", "y", "z"]);
        let order = execution_sequence(&nodes, &[]);
        // Each root is prepended after the previous one.
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn sequence_terminates_on_cycle() {
        let nodes = vec![make_node("t", NodeKind::Trigger), make_node("a", NodeKind::Action)];
        let order = execution_sequence(&nodes, &edges(&[("t", "a"), ("a", "t")]));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn dangling_target_appears_in_sequence() {
        let nodes = vec![make_node("t", NodeKind::Trigger)];
        let order = execution_sequence(&nodes, &edges(&[("t", "ghost")]));
        assert_eq!(order, vec!["t", "ghost"]);
    }
}
