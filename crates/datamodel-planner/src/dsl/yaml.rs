//! YAML pipeline documents.
//!
//! Example:
//! ```yaml
//! config: { default_reducer: sum }
//! sources:
//!   sales:
//!     path: sales.csv
//!     format: csv
//!     schema:
//!       - { name: city,  type: dimension }
//!       - { name: sales, type: measure }
//!   regions:
//!     path: regions.jsonl
//!     format: jsonl
//!     schema: [ { name: city, type: dimension }, { name: region, type: dimension } ]
//! input: sales
//! steps:
//!   - { op: select, expr: "sales > 5" }
//!   - { op: group_by, dimensions: [city], reducers: { sales: sum } }
//!   - { op: join, kind: left, with: regions, on: [[city, city]] }
//!   - { op: sort, by: [ { field: sales, order: desc } ] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use datamodel_core::config::{ConfigOverrides, EngineConfig};
use datamodel_core::prelude::{FieldSpec, FieldType};
use datamodel_operators::{JoinKind, ReducerSpec, SortOrder};

use crate::error::{PlanError, Result};
use crate::expr::{parse_arithmetic, parse_predicate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDoc {
    #[serde(default)]
    pub config: ConfigOverrides,
    pub sources: BTreeMap<String, SourceDef>,
    /// Source the steps start from.
    pub input: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Json,
    Jsonl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDef {
    /// Relative paths resolve against the pipeline file's directory.
    pub path: String,
    pub format: SourceFormat,
    pub schema: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDef {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKindDef {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl From<JoinKindDef> for JoinKind {
    fn from(k: JoinKindDef) -> Self {
        match k {
            JoinKindDef::Inner => JoinKind::Inner,
            JoinKindDef::Left => JoinKind::LeftOuter,
            JoinKindDef::Right => JoinKind::RightOuter,
            JoinKindDef::Full => JoinKind::FullOuter,
            JoinKindDef::Cross => JoinKind::Cross,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Step {
    Select {
        expr: String,
        #[serde(default)]
        inverse: bool,
    },

    Project {
        fields: Vec<String>,
    },

    Calculate {
        name: String,
        expr: String,
        #[serde(default = "default_calculated_type", rename = "type")]
        field_type: FieldType,
    },

    Sort {
        by: Vec<SortDef>,
    },

    Bin {
        field: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        size: Option<f64>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        start: Option<f64>,
        #[serde(default)]
        end: Option<f64>,
        #[serde(default)]
        boundaries: Option<Vec<f64>>,
    },

    GroupBy {
        dimensions: Vec<String>,
        #[serde(default)]
        reducers: ReducerSpec,
    },

    Join {
        #[serde(default = "default_join_kind")]
        kind: JoinKindDef,
        with: String,
        /// Empty means a natural join on shared field names.
        #[serde(default)]
        on: Vec<(String, String)>,
        #[serde(default)]
        left_alias: Option<String>,
        #[serde(default)]
        right_alias: Option<String>,
    },

    Union {
        with: String,
    },

    Difference {
        with: String,
    },
}

fn default_calculated_type() -> FieldType {
    FieldType::Measure
}

fn default_join_kind() -> JoinKindDef {
    JoinKindDef::Inner
}

impl Step {
    /// Source this step reads besides the running model, if any.
    pub fn other_source(&self) -> Option<&str> {
        match self {
            Step::Join { with, .. } | Step::Union { with } | Step::Difference { with } => {
                Some(with.as_str())
            }
            _ => None,
        }
    }
}

impl PipelineDoc {
    /// `base` with this document's `config:` block applied.
    pub fn engine_config(&self, base: EngineConfig) -> EngineConfig {
        let mut cfg = base;
        cfg.apply(&self.config);
        cfg
    }

    /// Static checks: every referenced source is declared and every expression parses.
    pub fn check(&self) -> Result<()> {
        if !self.sources.contains_key(&self.input) {
            return Err(PlanError::UnknownSource(self.input.clone()));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if let Some(name) = step.other_source() {
                if !self.sources.contains_key(name) {
                    return Err(PlanError::UnknownSource(name.to_string()));
                }
            }
            match step {
                Step::Select { expr, .. } => {
                    parse_predicate(expr)?;
                }
                Step::Calculate { expr, .. } => {
                    parse_arithmetic(expr)?;
                }
                Step::Bin {
                    size,
                    count,
                    boundaries,
                    ..
                } => {
                    let given = [size.is_some(), count.is_some(), boundaries.is_some()];
                    if given.iter().filter(|g| **g).count() > 1 {
                        return Err(PlanError::Invalid(format!(
                            "step {i}: bin takes one of size, count or boundaries"
                        )));
                    }
                }
                Step::Sort { by } if by.is_empty() => {
                    return Err(PlanError::Invalid(format!("step {i}: sort needs a key")));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Parse and statically check a pipeline document.
pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<PipelineDoc> {
    let doc: PipelineDoc = serde_yaml::from_str(yaml_src)?;
    doc.check()?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
config: { default_reducer: avg }
sources:
  sales:
    path: sales.csv
    format: csv
    schema:
      - { name: city, type: dimension }
      - { name: sales, type: measure }
  regions:
    path: regions.jsonl
    format: jsonl
    schema: [ { name: city, type: dimension }, { name: region, type: dimension } ]
input: sales
steps:
  - { op: select, expr: "sales > 5" }
  - { op: calculate, name: doubled, expr: "sales * 2" }
  - { op: bin, field: sales, size: 10, start: 0 }
  - { op: group_by, dimensions: [city], reducers: { sales: sum } }
  - { op: join, kind: left, with: regions, on: [[city, city]] }
  - { op: sort, by: [ { field: sales, order: desc } ] }
"#;

    #[test]
    fn parses_full_document() {
        let doc = parse_yaml_pipeline(DOC).unwrap();
        assert_eq!(doc.sources.len(), 2);
        assert_eq!(doc.sources["regions"].format, SourceFormat::Jsonl);
        assert_eq!(doc.steps.len(), 6);
        assert!(matches!(
            &doc.steps[4],
            Step::Join { kind: JoinKindDef::Left, on, .. }
                if on == &vec![("city".to_string(), "city".to_string())]
        ));
        assert!(matches!(
            &doc.steps[5],
            Step::Sort { by } if by[0].order == SortOrder::Desc
        ));
        let cfg = doc.engine_config(EngineConfig::default());
        assert_eq!(cfg.default_reducer, "avg");
    }

    #[test]
    fn unknown_sources_are_reported() {
        let doc = DOC.replace("with: regions", "with: nowhere");
        assert!(matches!(
            parse_yaml_pipeline(&doc),
            Err(PlanError::UnknownSource(s)) if s == "nowhere"
        ));
        let doc = DOC.replace("input: sales", "input: other");
        assert!(matches!(
            parse_yaml_pipeline(&doc),
            Err(PlanError::UnknownSource(_))
        ));
    }

    #[test]
    fn bad_steps_are_rejected() {
        let doc = DOC.replace("sales > 5", "sales");
        assert!(matches!(parse_yaml_pipeline(&doc), Err(PlanError::Invalid(_))));
        let doc = DOC.replace("size: 10, start: 0", "size: 10, count: 3");
        assert!(matches!(parse_yaml_pipeline(&doc), Err(PlanError::Invalid(_))));
        let doc = DOC.replace("op: select", "op: explode");
        assert!(matches!(parse_yaml_pipeline(&doc), Err(PlanError::Yaml(_))));
    }
}
