//! Derived fields: `calculate_variable` appends a computed column.
//!
//! The new column lives in a derived store that shares every parent column by
//! reference; the parent model and store are left untouched.

use std::fmt;
use std::sync::Arc;

use datamodel_core::config::DEFAULT_TEMPORAL_FORMAT;
use datamodel_core::prelude::{DataModel, Error, Field, FieldSpec, Result, Row, Scalar};
use datamodel_core::store::Column;

use crate::context::Context;
use crate::trace;
use crate::traits::Operator;

/// Computes one value per row.
pub type RowFn = Arc<dyn Fn(&Row<'_>) -> Scalar + Send + Sync>;

/// Append `spec` as a new field whose value for each active row is `f(row)`,
/// coerced by the field's subtype. Inactive physical rows hold `Null`.
pub fn calculate_variable<F>(model: &DataModel, spec: FieldSpec, f: F) -> Result<DataModel>
where
    F: Fn(&Row<'_>) -> Scalar,
{
    calculate_with_format(model, spec, f, DEFAULT_TEMPORAL_FORMAT)
}

fn calculate_with_format<F>(
    model: &DataModel,
    spec: FieldSpec,
    f: F,
    temporal_format: &str,
) -> Result<DataModel>
where
    F: Fn(&Row<'_>) -> Scalar,
{
    let field = Field::from(spec);
    if model.schema().contains(&field.name) {
        return Err(Error::DuplicateField(field.name));
    }

    let mut values = vec![Scalar::Null; model.store().len()];
    for row in model.rows() {
        values[row.index()] = field.coerce(f(&row), temporal_format);
    }

    let store = model
        .store()
        .with_column(Column::new(field.name.clone(), values))?;
    let schema = model.schema().with_field(field)?;
    model.with_store(store, schema)
}

/// `calculate_variable` as a pipeline stage.
#[derive(Clone)]
pub struct CalculateVariable {
    pub spec: FieldSpec,
    pub f: RowFn,
    /// Shown in reports; usually the source expression.
    pub label: String,
}

impl CalculateVariable {
    pub fn new<F>(spec: FieldSpec, label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Row<'_>) -> Scalar + Send + Sync + 'static,
    {
        Self {
            spec,
            f: Arc::new(f),
            label: label.into(),
        }
    }
}

impl fmt::Debug for CalculateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculateVariable")
            .field("spec", &self.spec)
            .field("label", &self.label)
            .finish()
    }
}

impl Operator for CalculateVariable {
    fn name(&self) -> &'static str {
        "calculate"
    }

    fn describe(&self) -> String {
        format!("calculate {} = {}", self.spec.name, self.label)
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        let out = calculate_with_format(
            input,
            self.spec.clone(),
            |row| (self.f)(row),
            &ctx.config.temporal_format,
        )?;
        trace::record(self.name(), input.len(), out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::select;
    use datamodel_core::prelude::{FieldSubtype, Schema};

    fn model() -> DataModel {
        let schema =
            Schema::from_specs(&[FieldSpec::dimension("city"), FieldSpec::measure("sales")])
                .unwrap();
        DataModel::from_columns(
            schema,
            vec![
                vec!["NY".into(), "LA".into(), "SF".into()],
                vec![Scalar::F64(10.0), Scalar::F64(7.0), Scalar::F64(2.0)],
            ],
        )
        .unwrap()
    }

    fn doubled(row: &Row<'_>) -> Scalar {
        row.value("sales")
            .as_f64()
            .map(|v| Scalar::F64(v * 2.0))
            .unwrap_or(Scalar::Null)
    }

    #[test]
    fn appends_field_and_keeps_parent_intact() {
        let m = model();
        let out = calculate_variable(&m, FieldSpec::measure("doubled"), doubled).unwrap();
        assert_eq!(
            out.schema().names().collect::<Vec<_>>(),
            vec!["city", "sales", "doubled"]
        );
        assert_eq!(out.row(1).value("doubled"), &Scalar::F64(14.0));
        assert_eq!(m.schema().len(), 2);
        assert!(m.store().column("doubled").is_none());
        assert!(m.store().shares_column(out.store(), "sales"));
    }

    #[test]
    fn only_active_rows_are_computed() {
        let m = select(&model(), |r| r.value("city") != &Scalar::from("LA"));
        let out = calculate_variable(&m, FieldSpec::measure("doubled"), doubled).unwrap();
        assert_eq!(out.diffset(), m.diffset());
        assert_eq!(out.value(1, "doubled"), Some(&Scalar::Null));
        assert_eq!(out.value(2, "doubled"), Some(&Scalar::F64(4.0)));
    }

    #[test]
    fn results_are_coerced_by_subtype() {
        let spec = FieldSpec::dimension("label").with_subtype(FieldSubtype::Categorical);
        let out = calculate_variable(&model(), spec, |r| r.value("sales").clone()).unwrap();
        assert_eq!(out.row(0).value("label"), &Scalar::from("10"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let err = calculate_variable(&model(), FieldSpec::measure("sales"), doubled).unwrap_err();
        assert_eq!(err, Error::DuplicateField("sales".into()));
    }

    #[test]
    fn projected_away_name_can_be_reused() {
        let m = crate::project::project(&model(), &["city"]).unwrap();
        let out =
            calculate_variable(&m, FieldSpec::measure("sales"), |_| Scalar::F64(1.0)).unwrap();
        assert_eq!(out.row(0).value("sales"), &Scalar::F64(1.0));
    }
}
