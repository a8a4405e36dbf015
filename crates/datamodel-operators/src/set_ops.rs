//! Set algebra over schema-compatible models.
//!
//! Row identity is the full tuple of field values under key equality. Field
//! order may differ between the two sides; values are aligned by name.

use datamodel_core::prelude::{DataModel, Error, Result, Scalar};

use crate::context::Context;
use crate::keys::{row_key, KeyIndex};
use crate::trace;
use crate::traits::Operator;

/// Schema positions in `other` for each field of `model`, by name.
fn aligned_positions(model: &DataModel, other: &DataModel) -> Result<Vec<usize>> {
    model.schema().ensure_compatible(other.schema())?;
    model
        .schema()
        .fields
        .iter()
        .map(|f| {
            other
                .schema()
                .index_of(&f.name)
                .ok_or_else(|| Error::unknown_field(f.name.clone()))
        })
        .collect()
}

/// Rows of `a`, then rows of `b` not already present, without duplicates.
/// The result takes `a`'s schema and gets a fresh store.
pub fn union(a: &DataModel, b: &DataModel) -> Result<DataModel> {
    let b_positions = aligned_positions(a, b)?;
    let a_positions: Vec<usize> = (0..a.schema().len()).collect();

    let mut seen: KeyIndex<'_, ()> = KeyIndex::new();
    let mut columns: Vec<Vec<Scalar>> = vec![Vec::new(); a.schema().len()];
    let mut kept = 0;

    let sides = [(a, &a_positions), (b, &b_positions)];
    for (model, positions) in sides {
        for row in model.row_diffset_iterator() {
            let key = row_key(model, positions, row);
            if seen.contains(&key) {
                continue;
            }
            for (col, value) in columns.iter_mut().zip(key.iter()) {
                col.push((*value).clone());
            }
            seen.insert(key, ());
            kept += 1;
        }
    }

    DataModel::from_columns_with_len(a.schema().clone(), columns, kept)
}

/// Rows of `a` whose value tuple does not occur in `b`. Shares `a`'s store.
pub fn difference(a: &DataModel, b: &DataModel) -> Result<DataModel> {
    let b_positions = aligned_positions(a, b)?;
    let a_positions: Vec<usize> = (0..a.schema().len()).collect();

    let mut present: KeyIndex<'_, ()> = KeyIndex::new();
    for row in b.row_diffset_iterator() {
        present.insert(row_key(b, &b_positions, row), ());
    }
    let diffset = a
        .diffset()
        .filter(|row| !present.contains(&row_key(a, &a_positions, row)));
    Ok(a.with_diffset(diffset))
}

/// Which set operation a `SetOp` stage applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Difference,
}

/// Set operation against a fixed right-hand model.
#[derive(Debug, Clone)]
pub struct SetOp {
    pub kind: SetOpKind,
    pub other: DataModel,
    /// Shown in reports, e.g. the source name of `other`.
    pub label: String,
}

impl SetOp {
    pub fn union(other: DataModel, label: impl Into<String>) -> Self {
        Self {
            kind: SetOpKind::Union,
            other,
            label: label.into(),
        }
    }

    pub fn difference(other: DataModel, label: impl Into<String>) -> Self {
        Self {
            kind: SetOpKind::Difference,
            other,
            label: label.into(),
        }
    }
}

impl Operator for SetOp {
    fn name(&self) -> &'static str {
        match self.kind {
            SetOpKind::Union => "union",
            SetOpKind::Difference => "difference",
        }
    }

    fn describe(&self) -> String {
        format!("{} {}", self.name(), self.label)
    }

    fn eval(&self, input: &DataModel, _ctx: &Context) -> Result<DataModel> {
        let out = match self.kind {
            SetOpKind::Union => union(input, &self.other)?,
            SetOpKind::Difference => difference(input, &self.other)?,
        };
        trace::record(self.name(), input.len() + self.other.len(), out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use datamodel_core::prelude::{FieldSpec, Schema};

    fn model(rows: &[(&str, f64)]) -> DataModel {
        let schema =
            Schema::from_specs(&[FieldSpec::dimension("k"), FieldSpec::measure("v")]).unwrap();
        DataModel::from_columns(
            schema,
            vec![
                rows.iter().map(|(k, _)| Scalar::from(*k)).collect(),
                rows.iter().map(|(_, v)| Scalar::F64(*v)).collect(),
            ],
        )
        .unwrap()
    }

    fn values(m: &DataModel) -> Vec<Vec<Scalar>> {
        m.get_data().data
    }

    #[test]
    fn union_keeps_a_order_then_b_residue() {
        let a = model(&[("x", 1.0), ("y", 2.0), ("x", 1.0)]);
        let b = model(&[("z", 3.0), ("y", 2.0)]);
        let out = union(&a, &b).unwrap();
        assert_eq!(
            values(&out),
            vec![
                vec!["x".into(), Scalar::F64(1.0)],
                vec!["y".into(), Scalar::F64(2.0)],
                vec!["z".into(), Scalar::F64(3.0)],
            ]
        );
    }

    #[test]
    fn union_is_idempotent() {
        let a = model(&[("x", 1.0), ("y", 2.0)]);
        assert_eq!(values(&union(&a, &a).unwrap()), values(&a));
    }

    #[test]
    fn union_aligns_fields_by_name() {
        let a = model(&[("x", 1.0)]);
        let b = crate::project::project(&model(&[("x", 1.0), ("w", 9.0)]), &["v", "k"]).unwrap();
        let out = union(&a, &b).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.row(1).value("k"), &Scalar::from("w"));
    }

    #[test]
    fn union_of_fieldless_views_keeps_one_empty_row() {
        let a = crate::project::project(&model(&[("x", 1.0), ("y", 2.0)]), &[] as &[&str]).unwrap();
        assert_eq!(a.len(), 2);
        let out = union(&a, &a).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(values(&out), vec![Vec::<Scalar>::new()]);
    }

    #[test]
    fn incompatible_schemas_are_rejected() {
        let a = model(&[("x", 1.0)]);
        let b = crate::project::project(&a, &["k"]).unwrap();
        assert!(matches!(union(&a, &b), Err(Error::SchemaMismatch(_))));
        assert!(matches!(difference(&a, &b), Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn difference_narrows_a() {
        let a = model(&[("x", 1.0), ("y", 2.0), ("z", 3.0)]);
        let b = model(&[("y", 2.0), ("z", 4.0)]);
        let out = difference(&a, &b).unwrap();
        assert_eq!(out.row_diffset_iterator().collect::<Vec<_>>(), vec![0, 2]);
        assert!(Arc::ptr_eq(out.store(), a.store()));
    }

    #[test]
    fn set_laws() {
        let a = model(&[("x", 1.0), ("y", 2.0)]);
        let b = model(&[("y", 2.0), ("q", 5.0)]);
        assert!(difference(&a, &a).unwrap().is_empty());
        let residue = difference(&union(&a, &b).unwrap(), &b).unwrap();
        for row in values(&residue) {
            assert!(values(&a).contains(&row));
        }
    }

    #[test]
    fn operator_form() {
        let a = model(&[("x", 1.0)]);
        let b = model(&[("y", 2.0)]);
        let op = SetOp::union(b, "other");
        assert_eq!(op.eval(&a, &Context::default()).unwrap().len(), 2);
        assert_eq!(op.describe(), "union other");
    }
}
