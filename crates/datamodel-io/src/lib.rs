#![forbid(unsafe_code)]
//! datamodel-io: getting rows in and out of DataModels.
//!
//! Readers turn files into `RawData` without interpreting values; the
//! schema's coercion rules run later in `data_builder`. Writers emit a
//! model's active rows in schema order.

pub mod error;
pub mod readers;
pub mod writers;

use std::path::Path;

use serde::{Deserialize, Serialize};

use datamodel_core::prelude::{data_builder, BuildOptions, DataModel, FieldSpec, RawData};

pub use error::{IoError, Result};
pub use readers::csv::{read_csv, read_csv_from};
pub use readers::json::{read_json, read_json_from, read_jsonl, read_jsonl_from};
pub use writers::csv::CsvWriter;
pub use writers::jsonl::JsonlWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    /// A single JSON array of objects.
    Json,
    /// One JSON object per line.
    Jsonl,
}

impl DataFormat {
    /// Guess from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(DataFormat::Csv),
            "json" => Some(DataFormat::Json),
            "jsonl" | "ndjson" => Some(DataFormat::Jsonl),
            _ => None,
        }
    }
}

/// Read `path` as `format`.
pub fn read_raw(path: &Path, format: DataFormat) -> Result<RawData> {
    match format {
        DataFormat::Csv => read_csv(path),
        DataFormat::Json => read_json(path),
        DataFormat::Jsonl => read_jsonl(path),
    }
}

/// Read `path` and build a DataModel with `schema`.
pub fn load_model(
    path: &Path,
    format: DataFormat,
    schema: &[FieldSpec],
    options: &BuildOptions,
) -> Result<DataModel> {
    let raw = read_raw(path, format)?;
    Ok(data_builder(&raw, schema, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamodel_core::prelude::Scalar;
    use std::io::Write;

    #[test]
    fn formats_follow_extensions() {
        assert_eq!(DataFormat::from_path(Path::new("a/b.CSV")), Some(DataFormat::Csv));
        assert_eq!(DataFormat::from_path(Path::new("x.ndjson")), Some(DataFormat::Jsonl));
        assert_eq!(DataFormat::from_path(Path::new("x.parquet")), None);
        assert_eq!(DataFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn load_model_coerces_through_schema() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "city,sales,when").unwrap();
        writeln!(f, "NY,10,2021-01-01").unwrap();
        writeln!(f, "LA,oops,").unwrap();
        let schema = [
            FieldSpec::dimension("city"),
            FieldSpec::measure("sales"),
            FieldSpec::temporal("when"),
        ];
        let model = load_model(f.path(), DataFormat::Csv, &schema, &BuildOptions::default())
            .unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.row(0).value("sales"), &Scalar::F64(10.0));
        assert_eq!(model.row(0).value("when"), &Scalar::I64(1_609_459_200_000));
        assert_eq!(model.row(1).value("sales"), &Scalar::Null);
        assert_eq!(model.row(1).value("when"), &Scalar::Null);
    }
}
