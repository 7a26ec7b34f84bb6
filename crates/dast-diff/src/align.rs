//! Sequence alignment: longest common subsequence plus move pairing.
//!
//! [`align`] partitions two sequences into kept pairs, removed elements and
//! added elements. [`Alignment::pair_moves`] then turns removed/added
//! leftovers that a caller-supplied matcher accepts into [`Move`]s.
//!
//! The dynamic-programming table is O(n·m) in time and space, which is fine
//! for per-field child lists.

use tracing::debug;

use crate::error::{DiffError, DiffResult};

/// Index pairs `(before, after)` of a longest common subsequence.
///
/// `table[i][j]` holds the LCS length of `before[..i]` and `after[..j]`.
/// When dropping either element gives the same length, the element of
/// `before` is dropped first, so the result is deterministic and duplicates
/// are matched in their original order.
pub fn lcs_pairs<T: PartialEq>(before: &[T], after: &[T]) -> Vec<(usize, usize)> {
    let n = before.len();
    let m = after.len();
    let width = m + 1;
    let mut table = vec![0usize; (n + 1) * width];

    for i in 1..=n {
        for j in 1..=m {
            table[i * width + j] = if before[i - 1] == after[j - 1] {
                table[(i - 1) * width + (j - 1)] + 1
            } else {
                table[(i - 1) * width + j].max(table[i * width + (j - 1)])
            };
        }
    }

    let mut pairs = Vec::with_capacity(table[n * width + m]);
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if before[i - 1] == after[j - 1] {
            pairs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if table[(i - 1) * width + j] >= table[i * width + (j - 1)] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    pairs.reverse();
    pairs
}

/// A longest common subsequence with membership flags for both inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcs<T> {
    pub common: Vec<T>,
    pub in_before: Vec<bool>,
    pub in_after: Vec<bool>,
}

/// Longest common subsequence of two sequences.
pub fn lcs<T: PartialEq + Clone>(before: &[T], after: &[T]) -> Lcs<T> {
    let pairs = lcs_pairs(before, after);
    let mut in_before = vec![false; before.len()];
    let mut in_after = vec![false; after.len()];
    let mut common = Vec::with_capacity(pairs.len());
    for &(i, j) in &pairs {
        in_before[i] = true;
        in_after[j] = true;
        common.push(before[i].clone());
    }
    Lcs {
        common,
        in_before,
        in_after,
    }
}

/// A removed element paired with an added element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Move {
    pub before: usize,
    pub after: usize,
    /// Both elements have the same fingerprint.
    pub exact: bool,
}

/// Three-way partition of two aligned sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    /// LCS pairs, increasing in both coordinates.
    pub kept: Vec<(usize, usize)>,
    /// Before-indices with no partner, ascending.
    pub removed: Vec<usize>,
    /// After-indices with no partner, ascending.
    pub added: Vec<usize>,
    /// Pairs found by [`Alignment::pair_moves`], in discovery order.
    pub moved: Vec<Move>,
}

impl Alignment {
    /// Every matched pair, kept or moved, sorted by before-index.
    pub fn matched(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<_> = self
            .kept
            .iter()
            .copied()
            .chain(self.moved.iter().map(|m| (m.before, m.after)))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Returns `true` if some matched pairs cross, i.e. elements changed
    /// their relative order.
    pub fn is_reordered(&self) -> bool {
        self.matched().windows(2).any(|w| w[0].1 > w[1].1)
    }

    /// Matched pairs whose positions differ, sorted by before-index.
    pub fn displaced(&self) -> Vec<(usize, usize)> {
        self.matched().into_iter().filter(|(i, j)| i != j).collect()
    }

    /// Greedily pair removed with added elements.
    ///
    /// Removed elements are visited left to right; each claims the first
    /// still-unclaimed added element that `matches` accepts. Paired indices
    /// leave `removed` / `added` and are recorded in `moved`. Returns the
    /// number of new pairs.
    pub fn pair_moves<F>(&mut self, exact: bool, mut matches: F) -> usize
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut claimed = vec![false; self.added.len()];
        let mut unpaired = Vec::with_capacity(self.removed.len());
        let mut found = 0;

        for &before in &self.removed {
            let slot = self
                .added
                .iter()
                .enumerate()
                .find(|&(k, &after)| !claimed[k] && matches(before, after))
                .map(|(k, _)| k);
            match slot {
                Some(k) => {
                    claimed[k] = true;
                    self.moved.push(Move {
                        before,
                        after: self.added[k],
                        exact,
                    });
                    found += 1;
                }
                None => unpaired.push(before),
            }
        }

        self.removed = unpaired;
        self.added = self
            .added
            .iter()
            .zip(&claimed)
            .filter(|(_, taken)| !**taken)
            .map(|(&after, _)| after)
            .collect();
        found
    }

    /// Pair removed with added elements by best score.
    ///
    /// Removed elements are visited left to right; each claims the
    /// still-unclaimed added element with the highest `score`, provided it
    /// reaches `threshold`. Ties go to the leftmost candidate. Returns the
    /// number of new pairs, all recorded as inexact moves.
    pub fn pair_similar<F>(&mut self, threshold: f64, mut score: F) -> usize
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut claimed = vec![false; self.added.len()];
        let mut unpaired = Vec::with_capacity(self.removed.len());
        let mut found = 0;

        for &before in &self.removed {
            let mut best: Option<(usize, f64)> = None;
            for (k, &after) in self.added.iter().enumerate() {
                if claimed[k] {
                    continue;
                }
                let s = score(before, after);
                if s >= threshold && best.map_or(true, |(_, top)| s > top) {
                    best = Some((k, s));
                }
            }
            match best {
                Some((k, _)) => {
                    claimed[k] = true;
                    self.moved.push(Move {
                        before,
                        after: self.added[k],
                        exact: false,
                    });
                    found += 1;
                }
                None => unpaired.push(before),
            }
        }

        self.removed = unpaired;
        self.added = self
            .added
            .iter()
            .zip(&claimed)
            .filter(|(_, taken)| !**taken)
            .map(|(&after, _)| after)
            .collect();
        found
    }
}

/// Align two sequences under element equality.
pub fn align<T: PartialEq>(before: &[T], after: &[T]) -> DiffResult<Alignment> {
    let kept = lcs_pairs(before, after);
    check_pairs(&kept, before.len(), after.len())?;

    let mut removed = Vec::with_capacity(before.len() - kept.len());
    let mut added = Vec::with_capacity(after.len() - kept.len());
    let mut pairs = kept.iter().peekable();
    let mut next_after = 0;
    for i in 0..before.len() {
        match pairs.peek() {
            Some(&&(pi, pj)) if pi == i => {
                added.extend(next_after..pj);
                next_after = pj + 1;
                pairs.next();
            }
            _ => removed.push(i),
        }
    }
    added.extend(next_after..after.len());

    debug!(
        before = before.len(),
        after = after.len(),
        kept = kept.len(),
        "aligned sequence"
    );

    Ok(Alignment {
        kept,
        removed,
        added,
        moved: Vec::new(),
    })
}

fn check_pairs(pairs: &[(usize, usize)], n: usize, m: usize) -> DiffResult<()> {
    if pairs.len() > n.min(m) {
        return Err(DiffError::AlignmentFailure(format!(
            "common subsequence of length {} exceeds inputs of length {n} and {m}",
            pairs.len()
        )));
    }
    for w in pairs.windows(2) {
        if w[0].0 >= w[1].0 || w[0].1 >= w[1].1 {
            return Err(DiffError::AlignmentFailure(format!(
                "pairs {:?} and {:?} are not increasing",
                w[0], w[1]
            )));
        }
    }
    if let Some(&(i, j)) = pairs.last() {
        if i >= n || j >= m {
            return Err(DiffError::AlignmentFailure(format!(
                "pair ({i}, {j}) is out of range"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn known_lcs_example() {
        let result = lcs(&chars("abcde"), &chars("abfgdfe"));
        assert_eq!(result.common, chars("abde"));
        assert_eq!(result.in_before, vec![true, true, false, true, true]);
        assert_eq!(
            result.in_after,
            vec![true, true, false, false, true, false, true]
        );
    }

    #[test]
    fn empty_before_is_all_added() {
        let a = align::<u8>(&[], &[1, 2, 3]).unwrap();
        assert!(a.kept.is_empty());
        assert!(a.removed.is_empty());
        assert_eq!(a.added, vec![0, 1, 2]);
    }

    #[test]
    fn empty_after_is_all_removed() {
        let a = align::<u8>(&[1, 2, 3], &[]).unwrap();
        assert_eq!(a.removed, vec![0, 1, 2]);
        assert!(a.added.is_empty());
    }

    #[test]
    fn identical_sequences_keep_everything() {
        let s = [4, 8, 15, 16, 23, 42];
        let a = align(&s, &s).unwrap();
        assert!(a.removed.is_empty() && a.added.is_empty());
        assert_eq!(a.kept.len(), s.len());
        assert!(a.kept.iter().all(|(i, j)| i == j));
    }

    #[test]
    fn tie_break_drops_before_first() {
        // Either element could be the LCS; dropping from `before` first keeps x.
        let a = align(&['x', 'y'], &['y', 'x']).unwrap();
        assert_eq!(a.kept, vec![(0, 1)]);
        assert_eq!(a.removed, vec![1]);
        assert_eq!(a.added, vec![0]);
    }

    #[test]
    fn duplicates_match_one_to_one() {
        let a = align(&[1, 1, 2], &[1, 2, 1, 1]).unwrap();
        assert_eq!(a.kept.len(), 2);
        let mut befores: Vec<_> = a.kept.iter().map(|p| p.0).collect();
        let mut afters: Vec<_> = a.kept.iter().map(|p| p.1).collect();
        befores.dedup();
        afters.dedup();
        assert_eq!(befores.len(), 2);
        assert_eq!(afters.len(), 2);
        assert_eq!(a.removed.len() + a.kept.len(), 3);
        assert_eq!(a.added.len() + a.kept.len(), 4);
    }

    #[test]
    fn partition_preserves_order() {
        let a = align(&chars("abcde"), &chars("abfgdfe")).unwrap();
        assert_eq!(a.kept, vec![(0, 0), (1, 1), (3, 4), (4, 6)]);
        assert_eq!(a.removed, vec![2]);
        assert_eq!(a.added, vec![2, 3, 5]);
    }

    #[test]
    fn exact_moves_pair_swapped_elements() {
        let before = ['x', 'y'];
        let after = ['y', 'x'];
        let mut a = align(&before, &after).unwrap();
        let found = a.pair_moves(true, |i, j| before[i] == after[j]);
        assert_eq!(found, 1);
        assert!(a.removed.is_empty());
        assert!(a.added.is_empty());
        assert_eq!(
            a.moved,
            vec![Move {
                before: 1,
                after: 0,
                exact: true
            }]
        );
        assert!(a.is_reordered());
        assert_eq!(a.displaced(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn moves_claim_each_added_element_once() {
        let before = ['a', 'b', 'b', 'c'];
        let after = ['c', 'b', 'x'];
        let mut a = align(&before, &after).unwrap();
        // LCS keeps one `b`; the other cannot claim it again.
        a.pair_moves(true, |i, j| before[i] == after[j]);
        let claimed: Vec<_> = a.moved.iter().map(|m| m.after).collect();
        let mut unique = claimed.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(claimed.len(), unique.len());
        assert!(a.removed.contains(&0));
        assert!(a.added.contains(&2));
    }

    #[test]
    fn similar_pairs_prefer_best_score() {
        let mut a = align(&['a', 'x'], &['n', 'a', 'y']).unwrap();
        let found = a.pair_similar(0.5, |_, j| if j == 2 { 0.9 } else { 0.5 });
        assert_eq!(found, 1);
        assert_eq!(
            a.moved,
            vec![Move {
                before: 1,
                after: 2,
                exact: false
            }]
        );
        assert_eq!(a.added, vec![0]);
    }

    #[test]
    fn similar_pairs_respect_threshold() {
        let mut a = align(&['x'], &['y']).unwrap();
        assert_eq!(a.pair_similar(0.5, |_, _| 0.4), 0);
        assert_eq!(a.removed, vec![0]);
        assert_eq!(a.added, vec![0]);
    }

    #[test]
    fn shifted_elements_are_not_reordered() {
        let mut a = align(&['a', 'x'], &['n', 'a', 'y']).unwrap();
        a.pair_moves(false, |i, j| (i, j) == (1, 2));
        assert!(!a.is_reordered());
        assert_eq!(a.displaced(), vec![(0, 1), (1, 2)]);
    }
}
