//! Test doubles: a scripted [`ExecutableNode`] and fixed randomness.
//!
//! Useful in unit and integration tests that need to force a particular
//! outcome instead of relying on the built-in simulators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{ExecutableNode, ExecutionContext, NodeData, NodeError, NodeOutcome, RandomSource};

/// Behaviour injected into `MockNode` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed with this message.
    Succeed(String),
    /// Fail with this message.
    Fail(String),
}

/// A mock node that records every call it receives and returns a
/// programmer-specified result.
#[derive(Debug)]
pub struct MockNode {
    /// What the node will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// Labels of every node this mock simulated (in call order).
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockNode {
    /// Create a mock that always succeeds with the given message.
    pub fn succeeding(message: impl Into<String>) -> Self {
        Self {
            behaviour: MockBehaviour::Succeed(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behaviour: MockBehaviour::Fail(message.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times this node has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    /// Labels seen so far, in call order.
    pub fn seen_labels(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ExecutableNode for MockNode {
    async fn execute(
        &self,
        data: &NodeData,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(data.label.clone());
        }

        match &self.behaviour {
            MockBehaviour::Succeed(msg) => Ok(NodeOutcome::completed(msg.clone())),
            MockBehaviour::Fail(msg) => Err(NodeError::Failed(msg.clone())),
        }
    }
}

/// Randomness that always returns the same sample.
///
/// `FixedRandom::new(0.0)` makes every chance succeed, `FixedRandom::new(0.99)`
/// makes any chance below 0.99 fail.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(f64);

impl FixedRandom {
    pub fn new(sample: f64) -> Self {
        Self(sample)
    }

    /// Every HTTP simulation succeeds.
    pub fn always_succeed() -> Self {
        Self(0.0)
    }

    /// Every HTTP simulation with probability below one fails.
    pub fn always_fail() -> Self {
        Self(0.999_999)
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_calls() {
        let node = MockNode::failing("boom");
        let ctx = ExecutionContext::new(Arc::new(FixedRandom::always_succeed()));
        let data = NodeData {
            label: "Fetch".into(),
            ..NodeData::default()
        };

        let result = node.execute(&data, &ctx).await;
        assert!(matches!(result, Err(NodeError::Failed(ref m)) if m == "boom"));
        assert_eq!(node.call_count(), 1);
        assert_eq!(node.seen_labels(), vec!["Fetch".to_string()]);
    }
}
