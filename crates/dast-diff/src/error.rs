//! Error types for the diff crate.

use dast_hash::HashError;
use dast_types::Path;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Fingerprinting rejected one of the trees.
    #[error(transparent)]
    MalformedTree(#[from] HashError),

    /// The two roots are not comparable representations.
    #[error("schema mismatch at {path}: cannot compare a {before} with a {after}")]
    SchemaMismatch {
        path: Path,
        before: &'static str,
        after: &'static str,
    },

    /// An internal invariant of the sequence aligner was violated.
    #[error("alignment invariant violated: {0}")]
    AlignmentFailure(String),
}

impl DiffError {
    /// Stable name of the error kind, for reporting failed pairs.
    pub fn kind(&self) -> &'static str {
        match self {
            DiffError::MalformedTree(_) => "malformed-tree",
            DiffError::SchemaMismatch { .. } => "schema-mismatch",
            DiffError::AlignmentFailure(_) => "alignment-failure",
        }
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
