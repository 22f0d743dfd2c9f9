//! `nodes` crate: node kinds, their data records, and the simulated
//! behaviour of every kind.
//!
//! Every simulator, built-in or test double, implements
//! [`ExecutableNode`]. The engine crate looks simulators up by [`NodeKind`]
//! in a [`NodeRegistry`] and dispatches through this trait object.

pub mod builtin;
pub mod data;
pub mod error;
pub mod kind;
pub mod mock;
pub mod random;
pub mod registry;
pub mod traits;

pub use data::NodeData;
pub use error::NodeError;
pub use kind::{Branch, NodeKind};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use registry::NodeRegistry;
pub use traits::{ExecutableNode, ExecutionContext, NodeOutcome};
