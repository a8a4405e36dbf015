//! Writers for a DataModel's active rows.

pub mod csv;
pub mod jsonl;
