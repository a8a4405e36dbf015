//! `data_builder`: raw records + schema descriptor → DataModel.
//!
//! This is the only place raw input is touched. Each cell goes through its
//! field's coercion rule once; the resulting columns are never written again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::DataModel;
use crate::schema::{FieldSpec, Schema};
use crate::types::Scalar;

/// Raw input accepted by `data_builder`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawData {
    /// Flat records, one object per row.
    Rows(Vec<Map<String, Value>>),
    /// Delimited data: a header row and positional value rows.
    Table {
        header: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
}

impl RawData {
    pub fn num_rows(&self) -> usize {
        match self {
            RawData::Rows(rows) => rows.len(),
            RawData::Table { rows, .. } => rows.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Temporal format used by fields that carry none.
    pub temporal_format: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl BuildOptions {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            temporal_format: cfg.temporal_format.clone(),
        }
    }
}

/// Build a DataModel from raw rows and a schema descriptor.
///
/// Records missing a described key contribute `Null`; undescribed keys are ignored.
pub fn data_builder(
    raw: &RawData,
    descriptor: &[FieldSpec],
    options: &BuildOptions,
) -> Result<DataModel> {
    let schema = Schema::from_specs(descriptor)?;
    let n = raw.num_rows();
    let mut columns: Vec<Vec<Scalar>> = schema
        .fields
        .iter()
        .map(|_| Vec::with_capacity(n))
        .collect();

    match raw {
        RawData::Rows(rows) => {
            for record in rows {
                for (field, column) in schema.fields.iter().zip(columns.iter_mut()) {
                    let value = record
                        .get(&field.name)
                        .map(Scalar::from_json)
                        .unwrap_or(Scalar::Null);
                    column.push(field.coerce(value, &options.temporal_format));
                }
            }
        }
        RawData::Table { header, rows } => {
            // Header position for each schema field.
            let positions = schema
                .fields
                .iter()
                .map(|f| {
                    header
                        .iter()
                        .position(|h| h == &f.name)
                        .ok_or_else(|| Error::unknown_field(f.name.clone()))
                })
                .collect::<Result<Vec<_>>>()?;
            for (row_idx, row) in rows.iter().enumerate() {
                if row.len() > header.len() {
                    return Err(Error::Build(format!(
                        "row {} has {} values for {} header columns",
                        row_idx,
                        row.len(),
                        header.len()
                    )));
                }
                for ((field, column), &pos) in schema
                    .fields
                    .iter()
                    .zip(columns.iter_mut())
                    .zip(positions.iter())
                {
                    let value = row.get(pos).map(Scalar::from_json).unwrap_or(Scalar::Null);
                    column.push(field.coerce(value, &options.temporal_format));
                }
            }
        }
    }

    DataModel::from_columns_with_len(schema, columns, n)
}
