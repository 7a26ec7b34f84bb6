//! Error types for the render crate.

use dast_types::Path;

/// Errors raised when a change set does not fit the trees it is rendered
/// against.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A record addresses a location the merge pass never reached.
    #[error("change at {path} does not resolve against the trees")]
    UnresolvedPath { path: Path },

    /// Records for one sequence contradict each other or the sequence.
    #[error("inconsistent changes for {path}: {reason}")]
    Inconsistent { path: Path, reason: String },
}

impl RenderError {
    /// Stable name of the error kind, for reporting failed pairs.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::UnresolvedPath { .. } => "unresolved-path",
            RenderError::Inconsistent { .. } => "inconsistent-changes",
        }
    }
}

/// Convenience alias for render results.
pub type RenderResult<T> = Result<T, RenderError>;
