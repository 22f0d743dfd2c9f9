//! Node-level error type.

use thiserror::Error;

use crate::NodeKind;

/// Errors returned by a node's `execute` method.
///
/// Any variant is a runtime failure of that one node: the engine logs it,
/// skips the node's direct successors and carries on with the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// The simulated step reported an unsuccessful outcome.
    #[error("{0}")]
    Failed(String),

    /// No simulator is registered for this kind of node.
    #[error("no simulator registered for node kind '{0}'")]
    Unsupported(NodeKind),
}
