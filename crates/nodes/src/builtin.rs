//! Built-in simulators, one per node kind.
//!
//! None of these perform real work: each one turns the node's data into a
//! log message and, for HttpRequest, a coin flip decides success.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    Branch, ExecutableNode, ExecutionContext, NodeData, NodeError, NodeKind, NodeOutcome,
};

/// Chance that a simulated HTTP request succeeds unless configured otherwise.
pub const DEFAULT_HTTP_SUCCESS_PROBABILITY: f64 = 0.8;

/// Trigger and Action nodes: always succeed.
#[derive(Debug, Clone, Copy)]
pub struct GenericNode {
    kind: NodeKind,
}

impl GenericNode {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl ExecutableNode for GenericNode {
    async fn execute(
        &self,
        data: &NodeData,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::completed(format!(
            "{} executed successfully",
            data.label_or(self.kind.as_str())
        )))
    }
}

/// End node: marks the workflow as completed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndNode;

#[async_trait]
impl ExecutableNode for EndNode {
    async fn execute(
        &self,
        _data: &NodeData,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::completed("Workflow completed"))
    }
}

/// Delay node: the wait itself is done by the engine before this runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayNode;

#[async_trait]
impl ExecutableNode for DelayNode {
    async fn execute(
        &self,
        data: &NodeData,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::completed(format!(
            "Waited {}s",
            data.delay_seconds()
        )))
    }
}

/// Condition node: `testValue == "false"` takes the `no` branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionNode;

impl ConditionNode {
    /// Branch chosen for the given data.
    pub fn decide(data: &NodeData) -> Branch {
        match data.test_value.as_deref() {
            Some("false") => Branch::No,
            _ => Branch::Yes,
        }
    }
}

#[async_trait]
impl ExecutableNode for ConditionNode {
    async fn execute(
        &self,
        data: &NodeData,
        _ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        let branch = Self::decide(data);
        Ok(NodeOutcome::branched(
            format!("Condition evaluated → took {branch} branch"),
            branch,
        ))
    }
}

/// HttpRequest node: succeeds with `success_probability`.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequestNode {
    success_probability: f64,
}

impl HttpRequestNode {
    /// `success_probability` is clamped to `[0, 1]`; NaN means the default.
    pub fn new(success_probability: f64) -> Self {
        let success_probability = if success_probability.is_nan() {
            DEFAULT_HTTP_SUCCESS_PROBABILITY
        } else {
            success_probability.clamp(0.0, 1.0)
        };
        Self { success_probability }
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_SUCCESS_PROBABILITY)
    }
}

#[async_trait]
impl ExecutableNode for HttpRequestNode {
    async fn execute(
        &self,
        data: &NodeData,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError> {
        let method = data.method.as_deref().filter(|m| !m.is_empty()).unwrap_or("GET");
        let url = data.url.as_deref().filter(|u| !u.is_empty()).unwrap_or("unknown");

        if ctx.random.chance(self.success_probability) {
            Ok(NodeOutcome::completed(format!("{method} {url} → 200 OK")))
        } else {
            debug!(run_id = %ctx.run_id, "simulated request to {} failed", url);
            Err(NodeError::Failed(format!("{method} {url} → 500 Error")))
        }
    }
}
