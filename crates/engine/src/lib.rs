//! `engine` crate: workflow graph model, DAG algorithms, validation, the
//! simulated execution engine, undo/redo history, and the document codec.

pub mod dag;
pub mod document;
pub mod error;
pub mod executor;
pub mod history;
pub mod models;
pub mod store;
pub mod validation;

pub use dag::{build_adjacency, detect_cycle, execution_sequence};
pub use error::EngineError;
pub use executor::{
    ExecutionEvent, ExecutionHandler, ExecutorConfig, LogRecord, LogSeverity, RecordingHandler,
    RunPhase, RunSummary, WorkflowExecutor,
};
pub use history::History;
pub use models::{Edge, Node, Position, Workflow};
pub use store::{SubscriptionId, WorkflowStore};
pub use validation::{validate, Issue, Rule, Severity, ValidationReport};

pub use nodes::{Branch, NodeData, NodeKind};
