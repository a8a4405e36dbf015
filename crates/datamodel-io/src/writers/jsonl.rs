//! NDJSON writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use datamodel_core::prelude::DataModel;

use crate::error::Result;

/// Writes each active row as one JSON object, keys in schema order.
/// Temporal values stay epoch milliseconds.
pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonlWriter<File> {
    pub fn to_path(path: &Path) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            rows_written: 0,
        }
    }

    pub fn write_model(&mut self, model: &DataModel) -> Result<()> {
        for row in model.rows() {
            let line = serde_json::to_string(&row.to_json())?;
            writeln!(self.writer, "{}", line)?;
            self.rows_written += 1;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::json::read_jsonl;
    use datamodel_core::prelude::{data_builder, BuildOptions, FieldSpec, Scalar, Schema};

    fn model() -> DataModel {
        let schema =
            Schema::from_specs(&[FieldSpec::measure("sales"), FieldSpec::dimension("city")])
                .unwrap();
        DataModel::from_columns(
            schema,
            vec![
                vec![Scalar::F64(1.5), Scalar::Null],
                vec!["NY".into(), "LA".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn keys_follow_schema_order() {
        let mut w = JsonlWriter::to_writer(Vec::new());
        w.write_model(&model()).unwrap();
        assert_eq!(w.rows_written(), 2);
        let out = String::from_utf8(w.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "{\"sales\":1.5,\"city\":\"NY\"}\n{\"sales\":null,\"city\":\"LA\"}\n"
        );
    }

    #[test]
    fn file_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let original = model();
        JsonlWriter::to_path(&path)
            .unwrap()
            .write_model(&original)
            .unwrap();
        let specs = [FieldSpec::measure("sales"), FieldSpec::dimension("city")];
        let back =
            data_builder(&read_jsonl(&path).unwrap(), &specs, &BuildOptions::default()).unwrap();
        assert_eq!(back.get_data().data, original.get_data().data);
    }
}
