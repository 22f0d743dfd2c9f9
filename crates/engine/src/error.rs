//! Engine-level error types.
//!
//! Structural and field problems in a graph are *not* errors here: they are
//! reported as [`Issue`](crate::validation::Issue)s by the validator. This
//! enum covers the failures that abort an operation outright.

use thiserror::Error;

use crate::validation::ValidationReport;

/// Errors produced by the workflow engine (document codec + run gating).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Document errors ------

    /// The document is not valid JSON, or an entry has the wrong shape.
    #[error("failed to parse workflow document: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The document root is not a JSON object.
    #[error("workflow document must be a JSON object")]
    NotAnObject,

    /// A required top-level key is absent.
    #[error("workflow document is missing the '{0}' key")]
    MissingKey(&'static str),

    /// Reading or writing a document file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // ------ Execution errors ------

    /// Validation found at least one error; the run was not started.
    #[error("workflow is not runnable: {} validation error(s)", .0.error_count())]
    NotRunnable(ValidationReport),
}

impl EngineError {
    /// `true` for every failure of the import path.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson(_) | Self::NotAnObject | Self::MissingKey(_)
        )
    }
}
