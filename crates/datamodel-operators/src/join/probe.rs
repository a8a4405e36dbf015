//! Row matching for joins.
//!
//! Equality conditions hash the inner side once and probe it with each outer
//! row. Arbitrary predicates fall back to a nested loop over both sides.

use datamodel_core::prelude::DataModel;

use crate::keys::{row_key, KeyIndex};

/// How an (outer, inner) pair of physical rows is tested.
pub(crate) enum Matcher<'p> {
    /// Key equality over schema positions. Empty key lists match every pair.
    Keys {
        outer: &'p [usize],
        inner: &'p [usize],
    },
    /// Arbitrary test over (outer row, inner row).
    Predicate(&'p dyn Fn(usize, usize) -> bool),
}

/// Matching pairs in outer order, inner order within each outer row. When
/// `keep_unmatched` is set, an outer row with no partner yields `(row, None)`.
pub(crate) fn pair_up(
    outer: &DataModel,
    inner: &DataModel,
    matcher: &Matcher<'_>,
    keep_unmatched: bool,
) -> Vec<(usize, Option<usize>)> {
    let mut pairs = Vec::new();
    match matcher {
        Matcher::Keys {
            outer: outer_keys,
            inner: inner_keys,
        } => {
            let mut index: KeyIndex<'_, usize> = KeyIndex::new();
            for row in inner.row_diffset_iterator() {
                index.insert(row_key(inner, inner_keys, row), row);
            }
            for o in outer.row_diffset_iterator() {
                let key = row_key(outer, outer_keys, o);
                let before = pairs.len();
                pairs.extend(index.matches(&key).map(|&i| (o, Some(i))));
                if keep_unmatched && pairs.len() == before {
                    pairs.push((o, None));
                }
            }
        }
        Matcher::Predicate(test) => {
            for o in outer.row_diffset_iterator() {
                let before = pairs.len();
                pairs.extend(
                    inner
                        .row_diffset_iterator()
                        .filter(|&i| test(o, i))
                        .map(|i| (o, Some(i))),
                );
                if keep_unmatched && pairs.len() == before {
                    pairs.push((o, None));
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamodel_core::prelude::{FieldSpec, Scalar, Schema};

    fn model(keys: &[i64]) -> DataModel {
        let schema = Schema::from_specs(&[FieldSpec::measure("k")]).unwrap();
        DataModel::from_columns(
            schema,
            vec![keys.iter().map(|k| Scalar::F64(*k as f64)).collect()],
        )
        .unwrap()
    }

    #[test]
    fn hash_and_nested_loop_agree() {
        let outer = model(&[1, 2, 3, 2]);
        let inner = model(&[2, 2, 4, 1]);
        let hashed = pair_up(
            &outer,
            &inner,
            &Matcher::Keys {
                outer: &[0],
                inner: &[0],
            },
            true,
        );
        let test = |o: usize, i: usize| outer.row(o).at(0).key_eq(inner.row(i).at(0));
        let looped = pair_up(&outer, &inner, &Matcher::Predicate(&test), true);
        assert_eq!(hashed, looped);
        assert_eq!(
            hashed,
            vec![
                (0, Some(3)),
                (1, Some(0)),
                (1, Some(1)),
                (2, None),
                (3, Some(0)),
                (3, Some(1)),
            ]
        );
    }

    #[test]
    fn empty_keys_pair_everything() {
        let pairs = pair_up(
            &model(&[1, 2]),
            &model(&[3, 4, 5]),
            &Matcher::Keys {
                outer: &[],
                inner: &[],
            },
            false,
        );
        assert_eq!(pairs.len(), 6);
    }
}
