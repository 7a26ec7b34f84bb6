//! Merge pass: fold a change set into a copy of the after tree.
//!
//! Records are indexed by location first, then a single walk over both trees
//! consumes them. Any record left over at the end addressed a location the
//! walk never reached, which means the change set belongs to other trees.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use dast_diff::{ChangeRecord, ChangeSet};
use dast_types::{Path, Value};

use crate::error::{RenderError, RenderResult};
use crate::merged::{Mark, Marked, Merged, MergedNode};
use crate::options::RenderOptions;

/// Build the merged tree for `changes` between `before` and `after`.
///
/// Neither input tree is modified.
pub fn merge(
    changes: &ChangeSet,
    before: &Value,
    after: &Value,
    options: &RenderOptions,
) -> RenderResult<Merged> {
    let mut merger = Merger::index(changes, options)?;
    let merged = merger.merge(before, after, &Path::root())?;
    merger.finish()?;
    Ok(merged)
}

struct Merger<'c> {
    options: &'c RenderOptions,
    changed: HashMap<&'c Path, (&'c Value, &'c Value)>,
    /// Container path to the after indices of its added elements.
    added: HashMap<Path, BTreeSet<usize>>,
    /// Container path to the before indices of its removed elements.
    removed: HashMap<Path, BTreeSet<usize>>,
    reordered: HashMap<&'c Path, &'c [(usize, usize)]>,
}

impl<'c> Merger<'c> {
    fn index(changes: &'c ChangeSet, options: &'c RenderOptions) -> RenderResult<Self> {
        let mut merger = Merger {
            options,
            changed: HashMap::new(),
            added: HashMap::new(),
            removed: HashMap::new(),
            reordered: HashMap::new(),
        };

        for record in changes {
            let fresh = match record {
                ChangeRecord::Changed { path, old, new } => {
                    merger.changed.insert(path, (old, new)).is_none()
                }
                ChangeRecord::Added { path, .. } => {
                    let (container, j) = element(path)?;
                    merger.added.entry(container).or_default().insert(j)
                }
                ChangeRecord::Removed { path, .. } => {
                    let (container, i) = element(path)?;
                    merger.removed.entry(container).or_default().insert(i)
                }
                ChangeRecord::Reordered { path, mapping } => {
                    merger.reordered.insert(path, mapping.as_slice()).is_none()
                }
            };
            if !fresh {
                return Err(RenderError::Inconsistent {
                    path: record.path().clone(),
                    reason: format!("more than one {} record", record.label()),
                });
            }
        }
        Ok(merger)
    }

    fn finish(self) -> RenderResult<()> {
        let leftover = self
            .changed
            .into_keys()
            .cloned()
            .chain(self.reordered.into_keys().cloned())
            .chain(
                self.added
                    .into_iter()
                    .chain(self.removed)
                    .filter_map(|(container, idx)| idx.first().map(|i| container.index(*i))),
            )
            .min();
        match leftover {
            Some(path) => Err(RenderError::UnresolvedPath { path }),
            None => Ok(()),
        }
    }

    fn merge(&mut self, before: &Value, after: &Value, path: &Path) -> RenderResult<Merged> {
        if let Some((old, new)) = self.changed.remove(path) {
            return Ok(Merged::delta(old, new));
        }

        match (before, after) {
            (Value::Node(b), Value::Node(a)) if b.kind == a.kind => {
                let names: BTreeSet<&String> = b.fields.keys().chain(a.fields.keys()).collect();
                let mut fields = BTreeMap::new();
                for name in names {
                    let merged =
                        self.merge(b.field(name), a.field(name), &path.field(name.as_str()))?;
                    if a.fields.contains_key(name) || merged.is_delta() {
                        fields.insert(name.clone(), merged);
                    }
                }
                Ok(Merged::Node(MergedNode {
                    kind: a.kind.clone(),
                    fields,
                }))
            }
            (Value::Seq(b), Value::Seq(a)) => self.merge_seq(b, a, path),
            _ => Ok(Merged::lift(after)),
        }
    }

    fn merge_seq(&mut self, before: &[Value], after: &[Value], path: &Path) -> RenderResult<Merged> {
        let added = self.added.remove(path).unwrap_or_default();
        let removed = self.removed.remove(path).unwrap_or_default();
        let moved: BTreeMap<usize, usize> = self
            .reordered
            .remove(path)
            .map(|mapping| mapping.iter().copied().collect())
            .unwrap_or_default();

        let inconsistent = |reason: &str| RenderError::Inconsistent {
            path: path.clone(),
            reason: reason.to_string(),
        };

        if added.iter().any(|&j| j >= after.len()) || removed.iter().any(|&i| i >= before.len()) {
            return Err(inconsistent("element index out of range"));
        }
        if before.len() - removed.len() != after.len() - added.len() {
            return Err(inconsistent("added and removed elements do not balance"));
        }
        if moved.keys().any(|i| removed.contains(i)) {
            return Err(inconsistent("removed element listed as reordered"));
        }

        // partner[i]: after index of before element i; owner[j]: the reverse
        let mut partner = vec![None; before.len()];
        let mut owner = vec![None; after.len()];
        let kept_before = (0..before.len()).filter(|i| !removed.contains(i));
        if moved.is_empty() {
            let kept_after = (0..after.len()).filter(|j| !added.contains(j));
            for (i, j) in kept_before.zip(kept_after) {
                partner[i] = Some(j);
                owner[j] = Some(i);
            }
        } else {
            for i in kept_before {
                let j = moved.get(&i).copied().unwrap_or(i);
                if j >= after.len() || added.contains(&j) || owner[j].is_some() {
                    return Err(inconsistent("reorder mapping does not fit the sequence"));
                }
                partner[i] = Some(j);
                owner[j] = Some(i);
            }
        }

        // A removed element goes right after the partner of the nearest
        // matched element preceding it, or first.
        let mut head = Vec::new();
        let mut trailing = vec![Vec::new(); after.len()];
        let mut anchor = None;
        for (i, slot) in partner.iter().enumerate() {
            match (slot, anchor) {
                (Some(j), _) => anchor = Some(*j),
                (None, Some(j)) => trailing[j].push(i),
                (None, None) => head.push(i),
            }
        }

        let deleted = |i: &usize| Marked::new(Mark::Deleted, Merged::lift(&before[*i]));
        let mut items: Vec<Marked> = head.iter().map(deleted).collect();
        for (j, value) in after.iter().enumerate() {
            match owner[j] {
                None => items.push(Marked::new(Mark::Inserted, Merged::lift(value))),
                Some(i) => {
                    let mark = if self.options.show_moves && moved.contains_key(&i) {
                        Mark::Moved
                    } else {
                        Mark::Plain
                    };
                    let merged = self.merge(&before[i], value, &path.index(i))?;
                    items.push(Marked::new(mark, merged));
                }
            }
            items.extend(trailing[j].iter().map(deleted));
        }

        debug!(
            path = %path,
            inserted = added.len(),
            deleted = removed.len(),
            moved = moved.len(),
            "sequence merged"
        );
        Ok(Merged::Seq(items))
    }
}

fn element(path: &Path) -> RenderResult<(Path, usize)> {
    path.split_index()
        .ok_or_else(|| RenderError::UnresolvedPath { path: path.clone() })
}
