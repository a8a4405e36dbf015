//! JSON array and JSON-lines readers → `RawData::Rows`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::{Map, Value};

use datamodel_core::prelude::RawData;

use crate::error::{IoError, Result};

pub fn read_json(path: &Path) -> Result<RawData> {
    read_json_from(BufReader::new(File::open(path)?))
}

/// A top-level array of objects.
pub fn read_json_from<R: Read>(reader: R) -> Result<RawData> {
    let value: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = value else {
        return Err(IoError::Format("expected a JSON array of objects".into()));
    };
    let rows = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| into_record(item, i + 1))
        .collect::<Result<Vec<_>>>()?;
    Ok(RawData::Rows(rows))
}

pub fn read_jsonl(path: &Path) -> Result<RawData> {
    read_jsonl_from(BufReader::new(File::open(path)?))
}

/// One object per line; blank lines are skipped.
pub fn read_jsonl_from<R: BufRead>(reader: R) -> Result<RawData> {
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(into_record(serde_json::from_str(&line)?, i + 1)?);
    }
    Ok(RawData::Rows(rows))
}

fn into_record(value: Value, n: usize) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(IoError::Format(format!(
            "record {n}: expected an object, got {other}"
        ))),
    }
}
