//! DiffSets: the active-row view of a DataModel.
//!
//! A DiffSet is a strictly increasing set of physical row indices. It is either
//! the whole store (`Full`) or an explicit index list shared by reference, so
//! deriving a view never copies column data and cloning a view is O(1).

use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSet {
    /// Every physical row `0..len`.
    Full(usize),
    /// An explicit, strictly increasing index list.
    Indices(Arc<[usize]>),
}

impl DiffSet {
    pub fn full(len: usize) -> Self {
        DiffSet::Full(len)
    }

    pub fn empty() -> Self {
        DiffSet::Indices(Arc::from(Vec::<usize>::new()))
    }

    /// Build from indices that are already strictly increasing, e.g. the
    /// survivors of filtering another DiffSet.
    pub fn from_sorted(indices: Vec<usize>) -> Self {
        debug_assert!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "diffset indices must be strictly increasing"
        );
        DiffSet::Indices(Arc::from(indices))
    }

    /// Build from arbitrary indices; sorts and deduplicates.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut v: Vec<usize> = indices.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        DiffSet::Indices(Arc::from(v))
    }

    pub fn len(&self) -> usize {
        match self {
            DiffSet::Full(n) => *n,
            DiffSet::Indices(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        match self {
            DiffSet::Full(n) => index < *n,
            DiffSet::Indices(v) => v.binary_search(&index).is_ok(),
        }
    }

    /// Largest index + 1, or 0 when empty.
    pub fn upper_bound(&self) -> usize {
        match self {
            DiffSet::Full(n) => *n,
            DiffSet::Indices(v) => v.last().map(|i| i + 1).unwrap_or(0),
        }
    }

    /// Lazy, restartable walk of the active indices in ascending order.
    pub fn iter(&self) -> RowDiffsetIter<'_> {
        match self {
            DiffSet::Full(n) => RowDiffsetIter::Range(0..*n),
            DiffSet::Indices(v) => RowDiffsetIter::Indices(v.iter()),
        }
    }

    /// Keep the indices satisfying `keep`, preserving order.
    pub fn filter<F: FnMut(usize) -> bool>(&self, mut keep: F) -> DiffSet {
        DiffSet::from_sorted(self.iter().filter(|&i| keep(i)).collect())
    }
}

/// Iterator over a DiffSet; yields physical row indices without materializing them.
#[derive(Debug, Clone)]
pub enum RowDiffsetIter<'a> {
    Range(Range<usize>),
    Indices(std::slice::Iter<'a, usize>),
}

impl Iterator for RowDiffsetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            RowDiffsetIter::Range(r) => r.next(),
            RowDiffsetIter::Indices(it) => it.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            RowDiffsetIter::Range(r) => r.size_hint(),
            RowDiffsetIter::Indices(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for RowDiffsetIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_indices_sorts_and_dedups() {
        let ds = DiffSet::from_indices(vec![5, 1, 5, 3]);
        assert_eq!(ds.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert!(ds.contains(3));
        assert!(!ds.contains(2));
        assert_eq!(ds.upper_bound(), 6);
    }

    #[test]
    fn iteration_is_restartable() {
        let ds = DiffSet::full(3);
        let first: Vec<_> = ds.iter().collect();
        let second: Vec<_> = ds.iter().collect();
        assert_eq!(first, second);
        assert_eq!(ds.iter().len(), 3);
    }

    #[test]
    fn filter_narrows_and_handles_empty() {
        let ds = DiffSet::full(6).filter(|i| i % 2 == 0);
        assert_eq!(ds.iter().collect::<Vec<_>>(), vec![0, 2, 4]);
        let none = ds.filter(|_| false);
        assert!(none.is_empty());
        assert_eq!(none.iter().next(), None);
        assert!(DiffSet::empty().is_empty());
    }
}
