#![forbid(unsafe_code)]
//! datamodel-planner: YAML pipeline documents → operator pipelines.
//!
//! Design:
//! - `dsl::yaml` parses a document of named sources plus an ordered step list
//!   and checks it statically (sources exist, expressions parse).
//! - `expr` holds the small predicate/arithmetic language used by `select` and
//!   `calculate` steps; expressions bind to a schema at run time.
//! - `lower` turns a document and its loaded sources into a
//!   `datamodel_operators::Pipeline`; `validate` runs it over empty sources.
//!
//! NOTE: No file IO happens here. Loading sources is the caller's job.

pub mod dsl;
pub mod error;
pub mod expr;
pub mod lower;
pub mod stages;

pub use dsl::yaml::{parse_yaml_pipeline, PipelineDoc, SortDef, SourceDef, SourceFormat, Step};
pub use error::{PlanError, Result};
pub use lower::{empty_sources, input_model, lower, validate, Sources};
pub use stages::{ExprCalculate, ExprSelect};
