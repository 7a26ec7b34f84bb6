//! Foundation types for dast, the semantic syntax-tree differ.
//!
//! Every other dast crate depends on `dast-types`. Trees arrive from an
//! external parser as [`Value`]s; the differ addresses locations inside them
//! with [`Path`]s and compares subtrees through [`Fingerprint`]s.
//!
//! # Key Types
//!
//! - [`Value`] -- A field value: scalar, typed [`Node`], or ordered sequence
//! - [`Node`] -- A typed tree element with named fields
//! - [`Scalar`] -- Leaf values (None, booleans, numbers, strings)
//! - [`Path`] / [`PathStep`] -- Structured location of a change
//! - [`Fingerprint`] -- Canonical structural hash of a subtree

pub mod error;
pub mod fingerprint;
pub mod path;
pub mod value;

pub use error::TypeError;
pub use fingerprint::Fingerprint;
pub use path::{Path, PathStep};
pub use value::{Node, Scalar, Value, NONE, TYPE_KEY};
