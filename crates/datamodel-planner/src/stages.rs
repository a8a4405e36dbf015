//! Operators driven by DSL expressions.
//!
//! Expressions are bound against the schema of whatever model reaches the
//! stage, so a misspelled field fails as `UnknownField` at run time, the same
//! way every other operator reports it.

use datamodel_core::prelude::{DataModel, FieldSpec, FieldType, Result};
use datamodel_operators::select::{select_with_mode, SelectMode};
use datamodel_operators::{CalculateVariable, Context, Operator};

use crate::expr::{Arithmetic, Predicate};

/// `select` over a parsed predicate.
#[derive(Debug, Clone)]
pub struct ExprSelect {
    pub source: String,
    pub predicate: Predicate,
    pub inverse: bool,
}

impl Operator for ExprSelect {
    fn name(&self) -> &'static str {
        "select"
    }

    fn describe(&self) -> String {
        if self.inverse {
            format!("select not ({})", self.source)
        } else {
            format!("select {}", self.source)
        }
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        let bound = self
            .predicate
            .bind(input.schema(), &ctx.config.temporal_format)?;
        let mode = if self.inverse {
            SelectMode::Inverse
        } else {
            SelectMode::Normal
        };
        Ok(select_with_mode(input, |row| bound.eval(row), mode).selected)
    }
}

/// `calculate_variable` over a parsed arithmetic expression.
#[derive(Debug, Clone)]
pub struct ExprCalculate {
    pub name: String,
    pub field_type: FieldType,
    pub source: String,
    pub expr: Arithmetic,
}

impl Operator for ExprCalculate {
    fn name(&self) -> &'static str {
        "calculate"
    }

    fn describe(&self) -> String {
        format!("calculate {} = {}", self.name, self.source)
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        let bound = self.expr.bind(input.schema())?;
        let spec = FieldSpec::new(self.name.clone(), self.field_type);
        CalculateVariable::new(spec, self.source.clone(), move |row| bound.eval(row))
            .eval(input, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{parse_arithmetic, parse_predicate};
    use datamodel_core::prelude::{Error, Scalar, Schema};

    fn model() -> DataModel {
        let schema =
            Schema::from_specs(&[FieldSpec::dimension("city"), FieldSpec::measure("sales")])
                .unwrap();
        DataModel::from_columns(
            schema,
            vec![
                vec!["NY".into(), "LA".into()],
                vec![Scalar::F64(10.0), Scalar::F64(4.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn select_binds_at_eval() {
        let op = ExprSelect {
            source: "sales > 5".into(),
            predicate: parse_predicate("sales > 5").unwrap(),
            inverse: true,
        };
        let out = op.eval(&model(), &Context::default()).unwrap();
        assert_eq!(out.row_diffset_iterator().collect::<Vec<_>>(), vec![1]);
        assert_eq!(op.describe(), "select not (sales > 5)");
    }

    #[test]
    fn calculate_appends_field() {
        let op = ExprCalculate {
            name: "half".into(),
            field_type: FieldType::Measure,
            source: "sales / 2".into(),
            expr: parse_arithmetic("sales / 2").unwrap(),
        };
        let out = op.eval(&model(), &Context::default()).unwrap();
        assert_eq!(out.row(1).value("half"), &Scalar::F64(2.0));
    }

    #[test]
    fn unknown_fields_surface_as_data_errors() {
        let op = ExprSelect {
            source: "x > 1".into(),
            predicate: parse_predicate("x > 1").unwrap(),
            inverse: false,
        };
        assert_eq!(
            op.eval(&model(), &Context::default()).unwrap_err(),
            Error::UnknownField("x".into())
        );
    }
}
