//! `compose`: chain operators into a single pipeline.
//!
//! Stages run left to right, each consuming the previous stage's output. A
//! `Pipeline` is itself an `Operator`, so pipelines nest.

use std::fmt;

use serde::{Deserialize, Serialize};

use datamodel_core::prelude::{DataModel, Result};

use crate::context::Context;
use crate::traits::Operator;

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Operator>>,
}

/// Build a pipeline from `stages`, applied in order.
pub fn compose(stages: Vec<Box<dyn Operator>>) -> Pipeline {
    Pipeline { stages }
}

/// Per-stage summary produced by `Pipeline::run_with_report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub name: String,
    pub description: String,
    /// Active rows after the stage.
    pub rows: usize,
    /// Output field names after the stage.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub input_rows: usize,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn output_rows(&self) -> usize {
        self.stages.last().map(|s| s.rows).unwrap_or(self.input_rows)
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn then<O: Operator + 'static>(mut self, op: O) -> Self {
        self.stages.push(Box::new(op));
        self
    }

    pub fn push(&mut self, op: Box<dyn Operator>) {
        self.stages.push(op);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn Operator> + '_ {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// Run every stage. An empty pipeline returns its input unchanged.
    pub fn run(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        let mut current = input.clone();
        for stage in &self.stages {
            current = stage.eval(&current, ctx)?;
        }
        Ok(current)
    }

    /// Like `run`, also recording row counts and fields after each stage.
    pub fn run_with_report(
        &self,
        input: &DataModel,
        ctx: &Context,
    ) -> Result<(DataModel, PipelineReport)> {
        let mut report = PipelineReport {
            input_rows: input.len(),
            stages: Vec::with_capacity(self.stages.len()),
        };
        let mut current = input.clone();
        for stage in &self.stages {
            current = stage.eval(&current, ctx)?;
            report.stages.push(StageReport {
                name: stage.name().to_string(),
                description: stage.describe(),
                rows: current.len(),
                fields: current.schema().names().map(str::to_string).collect(),
            });
        }
        Ok((current, report))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.describe()))
            .finish()
    }
}

impl Operator for Pipeline {
    fn name(&self) -> &'static str {
        "compose"
    }

    fn describe(&self) -> String {
        let stages: Vec<String> = self.stages.iter().map(|s| s.describe()).collect();
        format!("compose [{}]", stages.join(" | "))
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        self.run(input, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_by::{GroupBy, ReducerSpec};
    use crate::project::Project;
    use crate::select::Select;
    use crate::sort::{Sort, SortKey};
    use datamodel_core::prelude::{Error, FieldSpec, Scalar, Schema};

    fn model() -> DataModel {
        let schema = Schema::from_specs(&[
            FieldSpec::dimension("city"),
            FieldSpec::measure("sales"),
            FieldSpec::measure("units"),
        ])
        .unwrap();
        DataModel::from_columns(
            schema,
            vec![
                vec!["NY".into(), "NY".into(), "LA".into(), "SF".into()],
                vec![
                    Scalar::F64(10.0),
                    Scalar::F64(5.0),
                    Scalar::F64(7.0),
                    Scalar::F64(1.0),
                ],
                vec![
                    Scalar::F64(1.0),
                    Scalar::F64(1.0),
                    Scalar::F64(1.0),
                    Scalar::F64(1.0),
                ],
            ],
        )
        .unwrap()
    }

    fn pipeline() -> Pipeline {
        compose(vec![
            Box::new(Select::new("sales > 2", |r| {
                r.value("sales").as_f64().is_some_and(|v| v > 2.0)
            })),
            Box::new(Project::new(["city", "sales"])),
            Box::new(GroupBy::new(["city"], ReducerSpec::new())),
            Box::new(Sort::new(vec![SortKey::asc("sales")])),
        ])
    }

    #[test]
    fn stages_apply_in_order() {
        let out = pipeline().run(&model(), &Context::default()).unwrap();
        assert_eq!(
            out.get_data().data,
            vec![
                vec!["LA".into(), Scalar::F64(7.0)],
                vec!["NY".into(), Scalar::F64(15.0)],
            ]
        );
    }

    #[test]
    fn compose_equals_manual_chaining() {
        let ctx = Context::default();
        let m = model();
        let p = pipeline();
        let mut manual = m.clone();
        for stage in p.stages() {
            manual = stage.eval(&manual, &ctx).unwrap();
        }
        assert_eq!(p.run(&m, &ctx).unwrap().get_data(), manual.get_data());
    }

    #[test]
    fn report_tracks_each_stage() {
        let (out, report) = pipeline()
            .run_with_report(&model(), &Context::default())
            .unwrap();
        assert_eq!(report.input_rows, 4);
        let rows: Vec<usize> = report.stages.iter().map(|s| s.rows).collect();
        assert_eq!(rows, vec![3, 3, 2, 2]);
        assert_eq!(report.stages[1].fields, vec!["city", "sales"]);
        assert_eq!(report.output_rows(), out.len());
    }

    #[test]
    fn pipelines_nest_and_empty_is_identity() {
        let ctx = Context::default();
        let nested = Pipeline::new().then(pipeline()).then(Pipeline::new());
        assert_eq!(nested.run(&model(), &ctx).unwrap().len(), 2);
        assert_eq!(Pipeline::new().run(&model(), &ctx).unwrap().len(), 4);
    }

    #[test]
    fn first_error_stops_the_pipeline() {
        let p = Pipeline::new()
            .then(Project::new(["nope"]))
            .then(Project::new(["city"]));
        let err = p.run(&model(), &Context::default()).unwrap_err();
        assert_eq!(err, Error::UnknownField("nope".into()));
    }
}
