//! Tree-level diff: walk two trees in parallel and collect changes.
//!
//! Equal fingerprints end the walk at any position, so unchanged subtrees
//! cost one memoized hash each. Nodes of different kinds are reported as a
//! single `Changed` record without looking inside. Sequence fields go
//! through the aligner; elements paired by similarity are walked in turn.
//!
//! Kept (LCS) pairs are never walked: their fingerprints are equal, so
//! nothing below them can differ.
//!
//! Representation mismatches are an error only at the root. Below the root a
//! field that switches representation (e.g. `None` to a node) is an ordinary
//! `Changed` record.

use std::collections::BTreeSet;

use tracing::debug;

use dast_hash::Fingerprinter;
use dast_types::{Path, Value};

use crate::align::align;
use crate::change::{ChangeRecord, ChangeSet};
use crate::config::DiffConfig;
use crate::error::{DiffError, DiffResult};
use crate::similarity::similarity;

/// Compare two trees and produce their change set.
///
/// Both roots are fingerprinted first, so a malformed tree fails before any
/// record is produced.
pub fn diff(before: &Value, after: &Value, config: &DiffConfig) -> DiffResult<ChangeSet> {
    let mut walk = Walk {
        config,
        fingerprinter: Fingerprinter::new(config.policy()),
        changes: ChangeSet::new(),
    };

    let before_fp = walk.fingerprinter.fingerprint(before)?;
    let after_fp = walk.fingerprinter.fingerprint(after)?;

    if std::mem::discriminant(before) != std::mem::discriminant(after) {
        return Err(DiffError::SchemaMismatch {
            path: Path::root(),
            before: before.representation(),
            after: after.representation(),
        });
    }

    if before_fp != after_fp {
        walk.compare(before, after, Path::root())?;
    }

    debug!(
        records = walk.changes.len(),
        fingerprints = walk.fingerprinter.cached(),
        "diff complete"
    );
    Ok(walk.changes)
}

struct Walk<'t> {
    config: &'t DiffConfig,
    fingerprinter: Fingerprinter<'t>,
    changes: ChangeSet,
}

impl<'t> Walk<'t> {
    fn compare(&mut self, before: &'t Value, after: &'t Value, path: Path) -> DiffResult<()> {
        if self.fingerprinter.fingerprint(before)? == self.fingerprinter.fingerprint(after)? {
            return Ok(());
        }

        match (before, after) {
            (Value::Node(b), Value::Node(a)) if b.kind == a.kind => {
                let names: BTreeSet<&'t String> = b
                    .fields
                    .keys()
                    .chain(a.fields.keys())
                    .filter(|name| !self.config.is_ignored(name))
                    .collect();
                for name in names {
                    let field_path = path.field(name.as_str());
                    match (b.field(name), a.field(name)) {
                        (Value::Seq(bs), Value::Seq(as_)) if self.config.is_unordered(name) => {
                            self.compare_seq(bs, as_, field_path, true)?
                        }
                        (bv, av) => self.compare(bv, av, field_path)?,
                    }
                }
            }
            (Value::Seq(b), Value::Seq(a)) => self.compare_seq(b, a, path, false)?,
            _ => self.changes.push(ChangeRecord::Changed {
                path,
                old: before.clone(),
                new: after.clone(),
            }),
        }
        Ok(())
    }

    /// Align two sequences. An unordered field is a multiset: equal elements
    /// always pair up, nothing is reported as reordered and elements are
    /// never paired by similarity.
    fn compare_seq(
        &mut self,
        before: &'t [Value],
        after: &'t [Value],
        path: Path,
        unordered: bool,
    ) -> DiffResult<()> {
        let before_fps = self.fingerprinter.fingerprint_all(before)?;
        let after_fps = self.fingerprinter.fingerprint_all(after)?;
        let mut alignment = align(&before_fps, &after_fps)?;

        if self.config.detect_reorders || unordered {
            alignment.pair_moves(true, |i, j| before_fps[i] == after_fps[j]);
        }
        if self.config.detect_reorders && !unordered {
            if let Some(threshold) = self.config.similarity_threshold {
                let fingerprinter = &mut self.fingerprinter;
                let mut failure = None;
                alignment.pair_similar(threshold, |i, j| {
                    match similarity(fingerprinter, &before[i], &after[j]) {
                        Ok(score) => score,
                        Err(e) => {
                            failure.get_or_insert(e);
                            0.0
                        }
                    }
                });
                if let Some(e) = failure {
                    return Err(e);
                }
            }
        }

        debug!(
            path = %path,
            kept = alignment.kept.len(),
            removed = alignment.removed.len(),
            added = alignment.added.len(),
            moved = alignment.moved.len(),
            "sequence field compared"
        );

        for &i in &alignment.removed {
            self.changes.push(ChangeRecord::Removed {
                path: path.index(i),
                value: before[i].clone(),
            });
        }
        for &j in &alignment.added {
            self.changes.push(ChangeRecord::Added {
                path: path.index(j),
                value: after[j].clone(),
            });
        }
        if alignment.is_reordered() && !unordered {
            self.changes.push(ChangeRecord::Reordered {
                path: path.clone(),
                mapping: alignment.displaced(),
            });
        }
        for m in alignment.moved.iter().filter(|m| !m.exact) {
            self.compare(&before[m.before], &after[m.after], path.index(m.before))?;
        }
        Ok(())
    }
}
