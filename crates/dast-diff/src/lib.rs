//! Diff engine for dast.
//!
//! Aligns child sequences with a longest-common-subsequence pass, pairs
//! moved elements, and walks two trees in parallel to produce a flat,
//! path-addressed change set.
//!
//! # Key Types
//!
//! - [`Alignment`] / [`Move`] -- Kept / removed / added partition of two sequences
//! - [`ChangeSet`] / [`ChangeRecord`] -- Result of one diff invocation
//! - [`DiffConfig`] -- Ignored fields, reorder detection, depth budget

pub mod align;
pub mod change;
pub mod config;
pub mod error;
pub mod similarity;
pub mod tree_diff;

pub use align::{align, lcs, lcs_pairs, Alignment, Lcs, Move};
pub use change::{ChangeRecord, ChangeSet};
pub use config::{DiffConfig, DEFAULT_IGNORED_FIELDS, DEFAULT_SIMILARITY_THRESHOLD};
pub use error::{DiffError, DiffResult};
pub use similarity::similarity;
pub use tree_diff::diff;
