//! Error types for the fingerprinting crate.

/// Errors that can occur while fingerprinting a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    /// The tree cannot be fingerprinted as given.
    #[error("malformed tree at depth {depth}: {reason}")]
    MalformedTree {
        /// Nesting depth, counted from the fingerprinted root, where the
        /// problem was found.
        depth: usize,
        reason: String,
    },
}

/// Convenience alias for fingerprinting results.
pub type HashResult<T> = Result<T, HashError>;
