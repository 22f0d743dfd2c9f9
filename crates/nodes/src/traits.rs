//! The `ExecutableNode` trait: the contract every node simulator must fulfil.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Branch, NodeData, NodeError, RandomSource};

/// Shared context passed to every node during a run.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Identifies the run, for log correlation.
    pub run_id: uuid::Uuid,
    /// Source of every simulated coin flip in the run.
    pub random: Arc<dyn RandomSource>,
}

impl ExecutionContext {
    /// Context for a new run drawing from `random`.
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            random,
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// A successful simulated step.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    /// Line shown in the execution log.
    pub message: String,
    /// Branch chosen by a Condition node; `None` for every other kind.
    pub branch: Option<Branch>,
}

impl NodeOutcome {
    /// A plain success with no branch decision.
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            branch: None,
        }
    }

    /// A Condition decision.
    pub fn branched(message: impl Into<String>, branch: Branch) -> Self {
        Self {
            message: message.into(),
            branch: Some(branch),
        }
    }
}

/// The core node trait.
///
/// Implementations must not suspend: the engine owns every delay in a run,
/// so `execute` resolves as soon as it is polled.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// Simulate the node described by `data` and report its outcome.
    async fn execute(
        &self,
        data: &NodeData,
        ctx: &ExecutionContext,
    ) -> Result<NodeOutcome, NodeError>;
}
