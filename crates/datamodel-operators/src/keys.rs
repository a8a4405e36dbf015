//! Hash buckets over key tuples, shared by grouping, set algebra and hash joins.

use std::collections::HashMap;

use datamodel_core::hash::{key_fingerprint, keys_eq};
use datamodel_core::prelude::{DataModel, Scalar};

/// Key tuple for physical row `row`, reading the schema positions `positions`.
pub(crate) fn row_key<'a>(
    model: &'a DataModel,
    positions: &[usize],
    row: usize,
) -> Vec<&'a Scalar> {
    positions.iter().map(|&pos| model.row(row).at(pos)).collect()
}

/// Buckets of `(key, payload)` entries keyed by fingerprint.
///
/// Entries keep insertion order inside a bucket, so `matches` replays them in
/// the order they were inserted.
pub(crate) struct KeyIndex<'a, T> {
    buckets: HashMap<u64, Vec<(Vec<&'a Scalar>, T)>>,
}

impl<'a, T> KeyIndex<'a, T> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: Vec<&'a Scalar>, payload: T) {
        let fp = key_fingerprint(key.iter().copied());
        self.buckets.entry(fp).or_default().push((key, payload));
    }

    /// Payloads whose key is `key_eq` to `key`, in insertion order.
    pub(crate) fn matches<'s, 'k>(&'s self, key: &'k [&'k Scalar]) -> Matches<'s, 'k, T> {
        let fp = key_fingerprint(key.iter().copied());
        let entries: &'s [(Vec<&'s Scalar>, T)] = match self.buckets.get(&fp) {
            Some(bucket) => bucket,
            None => &[],
        };
        Matches {
            entries: entries.iter(),
            key,
        }
    }

    pub(crate) fn first(&self, key: &[&Scalar]) -> Option<&T> {
        self.matches(key).next()
    }

    pub(crate) fn contains(&self, key: &[&Scalar]) -> bool {
        self.first(key).is_some()
    }
}

pub(crate) struct Matches<'s, 'k, T> {
    entries: std::slice::Iter<'s, (Vec<&'s Scalar>, T)>,
    key: &'k [&'k Scalar],
}

impl<'s, T> Iterator for Matches<'s, '_, T> {
    type Item = &'s T;

    fn next(&mut self) -> Option<&'s T> {
        for (k, payload) in self.entries.by_ref() {
            if keys_eq(k, self.key) {
                return Some(payload);
            }
        }
        None
    }
}
