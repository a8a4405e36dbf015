//! Readers producing `RawData`. Values stay uninterpreted text or JSON.

pub mod csv;
pub mod json;
