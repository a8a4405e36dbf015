//! Convenient re-exports for downstream crates.

pub use crate::builder::{data_builder, BuildOptions, RawData};
pub use crate::config::EngineConfig;
pub use crate::diffset::DiffSet;
pub use crate::error::{Error, Result};
pub use crate::model::{DataModel, Row};
pub use crate::schema::{Field, FieldSpec, FieldSubtype, FieldType, Schema};
pub use crate::types::Scalar;
