//! Delimited text → `RawData::Table`.
//!
//! The first record is the header. Every cell is kept as a JSON string; empty
//! cells become `null`. Ragged rows are accepted here and rejected by
//! `data_builder` if they run past the header.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use datamodel_core::prelude::RawData;

use crate::error::Result;

pub fn read_csv(path: &Path) -> Result<RawData> {
    read_csv_from(File::open(path)?)
}

pub fn read_csv_from<R: Read>(reader: R) -> Result<RawData> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::Headers)
        .from_reader(reader);

    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        Value::Null
                    } else {
                        Value::String(cell.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(RawData::Table { header, rows })
}
