//! Change records produced by one diff invocation.
//!
//! Paths follow one convention throughout: every step leading *to* a
//! sequence addresses the before tree, the final index of an
//! [`ChangeRecord::Added`] addresses the after sequence and the final index
//! of a [`ChangeRecord::Removed`] the before sequence.

use serde::{Deserialize, Serialize};

use dast_types::{Path, Value};

/// A single structural change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeRecord {
    /// An element present only in the after tree.
    Added { path: Path, value: Value },
    /// An element present only in the before tree.
    Removed { path: Path, value: Value },
    /// A field value (or a node whose kind changed) that differs.
    Changed { path: Path, old: Value, new: Value },
    /// Same-content elements of a sequence that changed relative order.
    /// `mapping` holds `(before index, after index)` for every matched
    /// element whose position differs, sorted by before index.
    Reordered {
        path: Path,
        mapping: Vec<(usize, usize)>,
    },
}

impl ChangeRecord {
    /// Location the record refers to.
    pub fn path(&self) -> &Path {
        match self {
            ChangeRecord::Added { path, .. }
            | ChangeRecord::Removed { path, .. }
            | ChangeRecord::Changed { path, .. }
            | ChangeRecord::Reordered { path, .. } => path,
        }
    }

    /// Short lowercase name of the record kind.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeRecord::Added { .. } => "added",
            ChangeRecord::Removed { .. } => "removed",
            ChangeRecord::Changed { .. } => "changed",
            ChangeRecord::Reordered { .. } => "reordered",
        }
    }
}

/// The ordered change set of one diff invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the trees were semantically identical.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    /// Number of added elements.
    pub fn additions(&self) -> usize {
        self.count(|r| matches!(r, ChangeRecord::Added { .. }))
    }

    /// Number of removed elements.
    pub fn removals(&self) -> usize {
        self.count(|r| matches!(r, ChangeRecord::Removed { .. }))
    }

    /// Number of changed values.
    pub fn changes(&self) -> usize {
        self.count(|r| matches!(r, ChangeRecord::Changed { .. }))
    }

    /// Number of reordered sequences.
    pub fn reorders(&self) -> usize {
        self.count(|r| matches!(r, ChangeRecord::Reordered { .. }))
    }

    fn count(&self, pred: impl Fn(&ChangeRecord) -> bool) -> usize {
        self.records.iter().filter(|r| pred(r)).count()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeRecord;
    type IntoIter = std::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeRecord;
    type IntoIter = std::vec::IntoIter<ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
