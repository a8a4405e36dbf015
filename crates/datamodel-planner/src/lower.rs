//! Lowering: `PipelineDoc` + loaded sources → runnable `Pipeline`.
//!
//! Steps map one to one onto operator stages. Two-input steps (`join`,
//! `union`, `difference`) capture the named source model at lowering time.

use std::collections::BTreeMap;

use datamodel_core::prelude::{data_builder, BuildOptions, DataModel, EngineConfig, RawData};
use datamodel_operators::{
    Bin, BinStrategy, Context, GroupBy, Join, JoinCondition, JoinOptions, Operator, Pipeline,
    PipelineReport, Project, SetOp, Sort, SortKey,
};

use crate::dsl::yaml::{PipelineDoc, Step};
use crate::error::{PlanError, Result};
use crate::expr::{parse_arithmetic, parse_predicate};
use crate::stages::{ExprCalculate, ExprSelect};

/// Loaded models keyed by source name.
pub type Sources = BTreeMap<String, DataModel>;

fn source<'a>(sources: &'a Sources, name: &str) -> Result<&'a DataModel> {
    sources
        .get(name)
        .ok_or_else(|| PlanError::UnknownSource(name.to_string()))
}

/// The model named by `doc.input`.
pub fn input_model<'a>(doc: &PipelineDoc, sources: &'a Sources) -> Result<&'a DataModel> {
    source(sources, &doc.input)
}

/// Build the operator pipeline for `doc`.
pub fn lower(doc: &PipelineDoc, sources: &Sources, cfg: &EngineConfig) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    for step in &doc.steps {
        pipeline.push(lower_step(step, sources, cfg)?);
    }
    Ok(pipeline)
}

fn lower_step(step: &Step, sources: &Sources, cfg: &EngineConfig) -> Result<Box<dyn Operator>> {
    let op: Box<dyn Operator> = match step {
        Step::Select { expr, inverse } => Box::new(ExprSelect {
            source: expr.clone(),
            predicate: parse_predicate(expr)?,
            inverse: *inverse,
        }),
        Step::Project { fields } => Box::new(Project::new(fields.iter().cloned())),
        Step::Calculate {
            name,
            expr,
            field_type,
        } => Box::new(ExprCalculate {
            name: name.clone(),
            field_type: *field_type,
            source: expr.clone(),
            expr: parse_arithmetic(expr)?,
        }),
        Step::Sort { by } => Box::new(Sort::new(
            by.iter()
                .map(|d| SortKey {
                    order: d.order,
                    ..SortKey::asc(d.field.clone())
                })
                .collect(),
        )),
        Step::Bin {
            field,
            name,
            size,
            count,
            start,
            end,
            boundaries,
        } => {
            let strategy = match (size, count, boundaries) {
                (Some(size), None, None) => Some(BinStrategy::Size {
                    size: *size,
                    start: *start,
                    end: *end,
                }),
                (None, Some(count), None) => Some(BinStrategy::Count {
                    count: *count,
                    start: *start,
                    end: *end,
                }),
                (None, None, Some(b)) => Some(BinStrategy::Boundaries(b.clone())),
                (None, None, None) if start.is_some() || end.is_some() => {
                    Some(BinStrategy::Count {
                        count: cfg.default_bin_count,
                        start: *start,
                        end: *end,
                    })
                }
                (None, None, None) => None,
                _ => {
                    return Err(PlanError::Invalid(format!(
                        "bin on '{field}' takes one of size, count or boundaries"
                    )))
                }
            };
            Box::new(Bin {
                field: field.clone(),
                name: name.clone(),
                strategy,
            })
        }
        Step::GroupBy {
            dimensions,
            reducers,
        } => Box::new(GroupBy::new(dimensions.iter().cloned(), reducers.clone())),
        Step::Join {
            kind,
            with,
            on,
            left_alias,
            right_alias,
        } => {
            let condition = if on.is_empty() {
                JoinCondition::Natural
            } else {
                JoinCondition::On(on.clone())
            };
            let options = JoinOptions {
                left_alias: left_alias.clone(),
                right_alias: right_alias.clone(),
            };
            let right = source(sources, with)?.clone();
            Box::new(
                Join::new((*kind).into(), right, with.clone())
                    .with_condition(condition)
                    .with_options(options),
            )
        }
        Step::Union { with } => Box::new(SetOp::union(
            source(sources, with)?.clone(),
            with.clone(),
        )),
        Step::Difference { with } => Box::new(SetOp::difference(
            source(sources, with)?.clone(),
            with.clone(),
        )),
    };
    Ok(op)
}

/// Zero-row models carrying each declared source schema.
pub fn empty_sources(doc: &PipelineDoc, cfg: &EngineConfig) -> Result<Sources> {
    let options = BuildOptions::from_config(cfg);
    doc.sources
        .iter()
        .map(|(name, def)| {
            let model = data_builder(&RawData::Rows(Vec::new()), &def.schema, &options)?;
            Ok((name.clone(), model))
        })
        .collect()
}

/// Run `doc` over empty sources so every field reference and schema rule is
/// checked without reading any data.
pub fn validate(doc: &PipelineDoc, cfg: &EngineConfig) -> Result<PipelineReport> {
    let sources = empty_sources(doc, cfg)?;
    let pipeline = lower(doc, &sources, cfg)?;
    let ctx = Context::new(cfg.clone());
    let (_, report) = pipeline.run_with_report(input_model(doc, &sources)?, &ctx)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::yaml::parse_yaml_pipeline;
    use datamodel_core::prelude::{Error, FieldSpec, Scalar, Schema};

    const DOC: &str = r#"
sources:
  sales:
    path: sales.csv
    format: csv
    schema:
      - { name: id, type: dimension }
      - { name: city, type: dimension }
      - { name: sales, type: measure }
  regions:
    path: regions.jsonl
    format: jsonl
    schema: [ { name: city, type: dimension }, { name: region, type: dimension } ]
input: sales
steps:
  - { op: select, expr: "sales > 2" }
  - { op: calculate, name: doubled, expr: "sales * 2" }
  - { op: group_by, dimensions: [city], reducers: { sales: sum, doubled: max } }
  - { op: join, kind: left, with: regions }
  - { op: sort, by: [ { field: sales, order: desc } ] }
"#;

    fn sources() -> Sources {
        let sales = Schema::from_specs(&[
            FieldSpec::dimension("id"),
            FieldSpec::dimension("city"),
            FieldSpec::measure("sales"),
        ])
        .unwrap();
        let regions =
            Schema::from_specs(&[FieldSpec::dimension("city"), FieldSpec::dimension("region")])
                .unwrap();
        let mut out = Sources::new();
        out.insert(
            "sales".into(),
            DataModel::from_columns(
                sales,
                vec![
                    vec!["1".into(), "2".into(), "3".into(), "4".into()],
                    vec!["NY".into(), "NY".into(), "LA".into(), "SF".into()],
                    vec![
                        Scalar::F64(10.0),
                        Scalar::F64(5.0),
                        Scalar::F64(7.0),
                        Scalar::F64(1.0),
                    ],
                ],
            )
            .unwrap(),
        );
        out.insert(
            "regions".into(),
            DataModel::from_columns(
                regions,
                vec![vec!["NY".into()], vec!["east".into()]],
            )
            .unwrap(),
        );
        out
    }

    #[test]
    fn lowered_pipeline_runs() {
        let doc = parse_yaml_pipeline(DOC).unwrap();
        let cfg = EngineConfig::default();
        let sources = sources();
        let pipeline = lower(&doc, &sources, &cfg).unwrap();
        assert_eq!(pipeline.len(), 5);
        let out = pipeline
            .run(input_model(&doc, &sources).unwrap(), &Context::new(cfg))
            .unwrap();
        assert_eq!(
            out.get_data().data,
            vec![
                vec!["NY".into(), Scalar::F64(15.0), Scalar::F64(20.0), "east".into()],
                vec!["LA".into(), Scalar::F64(7.0), Scalar::F64(14.0), Scalar::Null],
            ]
        );
    }

    #[test]
    fn validate_reports_each_stage() {
        let doc = parse_yaml_pipeline(DOC).unwrap();
        let report = validate(&doc, &EngineConfig::default()).unwrap();
        assert_eq!(report.input_rows, 0);
        assert_eq!(report.stages.len(), 5);
        assert_eq!(report.stages[3].name, "join");
        assert_eq!(
            report.stages[4].fields,
            vec!["city", "sales", "doubled", "region"]
        );
    }

    #[test]
    fn validate_catches_bad_field_references() {
        let doc = parse_yaml_pipeline(&DOC.replace("sales > 2", "revenue > 2")).unwrap();
        assert!(matches!(
            validate(&doc, &EngineConfig::default()),
            Err(PlanError::Data(Error::UnknownField(f))) if f == "revenue"
        ));
    }

    #[test]
    fn bin_defaults_to_config_count_with_explicit_range() {
        let doc = parse_yaml_pipeline(
            &DOC.replace(
                "  - { op: select, expr: \"sales > 2\" }",
                "  - { op: bin, field: sales, start: 0, end: 10 }",
            ),
        )
        .unwrap();
        let cfg = EngineConfig::default();
        let pipeline = lower(&doc, &sources(), &cfg).unwrap();
        assert_eq!(pipeline.stages().next().unwrap().describe(), "bin sales");
    }
}
