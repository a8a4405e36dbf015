#![forbid(unsafe_code)]
//! datamodel-core: the immutable, schema-aware table at the heart of the engine.
//!
//! - `schema`: fields (dimension/measure × categorical/continuous/temporal) and schemas
//! - `store`: the shared, reference-counted column store
//! - `diffset`: active-row views over a store
//! - `model`: `DataModel`, the unit every operator consumes and produces
//! - `builder`: `data_builder`, raw records → DataModel
//!
//! No operators live here; see `datamodel-operators`.

pub mod builder;
pub mod config;
pub mod diffset;
pub mod error;
pub mod hash;
pub mod model;
pub mod prelude;
pub mod schema;
pub mod store;
pub mod types;

pub use builder::{data_builder, BuildOptions, RawData};
pub use config::{ConfigOverrides, EngineConfig};
pub use diffset::{DiffSet, RowDiffsetIter};
pub use error::{Error, Result};
pub use model::{DataModel, DataTable, Row};
pub use schema::{
    format_temporal, get_common_schema, parse_temporal, Field, FieldSpec, FieldSubtype, FieldType,
    Schema,
};
pub use store::{Column, ColumnStore};
pub use types::Scalar;
