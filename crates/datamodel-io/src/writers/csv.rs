//! CSV writer. Header is the schema's field names; nulls are empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use datamodel_core::config::DEFAULT_TEMPORAL_FORMAT;
use datamodel_core::prelude::DataModel;

use crate::error::Result;

pub struct CsvWriter<W: Write> {
    writer: ::csv::Writer<W>,
    /// Used for temporal fields that carry no format of their own.
    temporal_format: String,
    rows_written: usize,
}

impl CsvWriter<File> {
    pub fn to_path(path: &Path) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: ::csv::Writer::from_writer(writer),
            temporal_format: DEFAULT_TEMPORAL_FORMAT.to_string(),
            rows_written: 0,
        }
    }

    pub fn with_temporal_format(mut self, format: impl Into<String>) -> Self {
        self.temporal_format = format.into();
        self
    }

    pub fn write_model(&mut self, model: &DataModel) -> Result<()> {
        let schema = model.schema();
        self.writer.write_record(schema.names())?;
        for row in model.rows() {
            let record = row
                .fields()
                .map(|(field, value)| field.render(value, &self.temporal_format));
            self.writer.write_record(record)?;
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
