//! Lookup from node kind to the simulator that runs it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::builtin::{ConditionNode, DelayNode, EndNode, GenericNode, HttpRequestNode};
use crate::{ExecutableNode, NodeKind};

/// Maps each [`NodeKind`] to a shared [`ExecutableNode`] implementation.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeKind, Arc<dyn ExecutableNode>>,
}

impl NodeRegistry {
    /// An empty registry. Every node run against it fails as unsupported.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with a built-in simulator for every kind.
    pub fn builtin(http_success_probability: f64) -> Self {
        let mut registry = Self::empty();
        registry
            .register(NodeKind::Trigger, GenericNode::new(NodeKind::Trigger))
            .register(NodeKind::Action, GenericNode::new(NodeKind::Action))
            .register(NodeKind::Condition, ConditionNode)
            .register(NodeKind::Delay, DelayNode)
            .register(
                NodeKind::HttpRequest,
                HttpRequestNode::new(http_success_probability),
            )
            .register(NodeKind::End, EndNode);
        registry
    }

    /// Install (or replace) the simulator for `kind`.
    pub fn register(
        &mut self,
        kind: NodeKind,
        node: impl ExecutableNode + 'static,
    ) -> &mut Self {
        self.nodes.insert(kind, Arc::new(node));
        self
    }

    /// Install an already shared simulator, e.g. a mock the test keeps a handle to.
    pub fn register_shared(&mut self, kind: NodeKind, node: Arc<dyn ExecutableNode>) -> &mut Self {
        self.nodes.insert(kind, node);
        self
    }

    pub fn get(&self, kind: NodeKind) -> Option<&Arc<dyn ExecutableNode>> {
        self.nodes.get(&kind)
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.nodes.contains_key(&kind)
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.nodes.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("NodeRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNode;

    #[test]
    fn builtin_covers_every_kind() {
        let registry = NodeRegistry::builtin(0.8);
        for kind in NodeKind::ALL {
            assert!(registry.contains(kind), "missing simulator for {kind}");
        }
        assert!(!NodeRegistry::empty().contains(NodeKind::End));
    }

    #[test]
    fn register_replaces_existing_simulator() {
        let mock = Arc::new(MockNode::failing("down"));
        let mut registry = NodeRegistry::builtin(0.8);
        registry.register_shared(NodeKind::Action, mock.clone());
        let installed = registry.get(NodeKind::Action).unwrap();
        assert!(Arc::ptr_eq(
            installed,
            &(mock as Arc<dyn ExecutableNode>)
        ));
    }
}
