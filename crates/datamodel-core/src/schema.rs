//! Field descriptors and ordered schemas.
//!
//! A `Schema` is pure metadata: it never owns column data. Its order defines the
//! column order every operator reports rows in.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Dimension,
    Measure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSubtype {
    Categorical,
    Continuous,
    Temporal,
}

impl FieldType {
    pub fn default_subtype(self) -> FieldSubtype {
        match self {
            FieldType::Dimension => FieldSubtype::Categorical,
            FieldType::Measure => FieldSubtype::Continuous,
        }
    }
}

/// Schema descriptor entry as supplied by callers (`{name, type, subtype}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub subtype: Option<FieldSubtype>,
    /// Reducer `group_by` falls back to when the reducer spec names none.
    #[serde(default)]
    pub default_reducer: Option<String>,
    /// chrono format string for temporal parsing.
    #[serde(default)]
    pub format: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            subtype: None,
            default_reducer: None,
            format: None,
        }
    }

    pub fn dimension(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Dimension)
    }

    pub fn measure(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Measure)
    }

    pub fn temporal(name: impl Into<String>) -> Self {
        Self::dimension(name).with_subtype(FieldSubtype::Temporal)
    }

    pub fn with_subtype(mut self, subtype: FieldSubtype) -> Self {
        self.subtype = Some(subtype);
        self
    }

    pub fn with_default_reducer(mut self, reducer: impl Into<String>) -> Self {
        self.default_reducer = Some(reducer.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// A resolved, immutable column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub subtype: FieldSubtype,
    pub default_reducer: Option<String>,
    pub format: Option<String>,
}

impl From<FieldSpec> for Field {
    fn from(spec: FieldSpec) -> Self {
        Self {
            subtype: spec.subtype.unwrap_or(spec.field_type.default_subtype()),
            name: spec.name,
            field_type: spec.field_type,
            default_reducer: spec.default_reducer,
            format: spec.format,
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, subtype: FieldSubtype) -> Self {
        Self {
            name: name.into(),
            field_type,
            subtype,
            default_reducer: None,
            format: None,
        }
    }

    pub fn is_measure(&self) -> bool {
        self.field_type == FieldType::Measure
    }

    pub fn is_dimension(&self) -> bool {
        self.field_type == FieldType::Dimension
    }

    /// Same descriptor under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Apply this field's coercion rule to a loosely-typed value.
    ///
    /// `default_format` is used for temporal strings when the field has no format.
    pub fn coerce(&self, value: Scalar, default_format: &str) -> Scalar {
        match self.subtype {
            FieldSubtype::Continuous => coerce_continuous(value),
            FieldSubtype::Categorical => match value {
                Scalar::Null => Scalar::Null,
                Scalar::Str(s) => Scalar::Str(s),
                other => Scalar::Str(other.to_string()),
            },
            FieldSubtype::Temporal => {
                let format = self.format.as_deref().unwrap_or(default_format);
                coerce_temporal(value, format)
            }
        }
    }
}

fn coerce_continuous(value: Scalar) -> Scalar {
    match value {
        Scalar::Null => Scalar::Null,
        Scalar::Bool(b) => Scalar::F64(if b { 1.0 } else { 0.0 }),
        Scalar::I64(i) => Scalar::F64(i as f64),
        Scalar::F64(f) => Scalar::F64(f),
        Scalar::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Scalar::F64)
            .unwrap_or(Scalar::Null),
    }
}

fn coerce_temporal(value: Scalar, format: &str) -> Scalar {
    match value {
        Scalar::I64(ms) => Scalar::I64(ms),
        Scalar::F64(ms) if ms.is_finite() => Scalar::I64(ms as i64),
        Scalar::Str(s) => parse_temporal(s.trim(), format)
            .map(Scalar::I64)
            .unwrap_or(Scalar::Null),
        _ => Scalar::Null,
    }
}

/// Parse a date/time string into epoch milliseconds (UTC).
///
/// Tries `format` as a datetime, then as a date, then RFC 3339, then `%Y-%m-%d`.
pub fn parse_temporal(s: &str, format: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, format) {
        return d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Render epoch milliseconds with `format`. Out-of-range instants give `None`.
pub fn format_temporal(ms: i64, format: &str) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc().format(format).to_string())
}

impl Field {
    /// Text form of a value of this field, as written to delimited output.
    /// Temporal values use the field's format, or `default_format`.
    pub fn render(&self, value: &Scalar, default_format: &str) -> String {
        match (self.subtype, value) {
            (FieldSubtype::Temporal, Scalar::I64(ms)) => {
                let format = self.format.as_deref().unwrap_or(default_format);
                format_temporal(*ms, format).unwrap_or_else(|| ms.to_string())
            }
            _ => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    /// Build a schema, rejecting duplicate names.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(fields.len());
        for f in &fields {
            if !seen.insert(f.name.as_str()) {
                return Err(Error::DuplicateField(f.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn from_specs(specs: &[FieldSpec]) -> Result<Self> {
        Self::new(specs.iter().cloned().map(Field::from).collect())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like `field`, but a missing name is an `UnknownField` error.
    pub fn require(&self, name: &str) -> Result<&Field> {
        self.field(name).ok_or_else(|| Error::unknown_field(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn measures(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|f| f.is_measure())
    }

    /// Restrict to `names`, in the order given.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Schema> {
        let fields = names
            .iter()
            .map(|n| self.require(n.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Schema::new(fields)
    }

    /// Append a field, rejecting a name already present.
    pub fn with_field(&self, field: Field) -> Result<Schema> {
        if self.contains(&field.name) {
            return Err(Error::DuplicateField(field.name));
        }
        let mut fields = self.fields.clone();
        fields.push(field);
        Ok(Schema { fields })
    }

    /// Same field names and types; order is irrelevant.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        self.len() == other.len()
            && self.fields.iter().all(|f| {
                other.field(&f.name).is_some_and(|o| {
                    o.field_type == f.field_type && o.subtype == f.subtype
                })
            })
    }

    pub fn ensure_compatible(&self, other: &Schema) -> Result<()> {
        if self.is_compatible(other) {
            return Ok(());
        }
        let left: Vec<&str> = self.names().collect();
        let right: Vec<&str> = other.names().collect();
        Err(Error::SchemaMismatch(format!(
            "[{}] vs [{}]",
            left.join(", "),
            right.join(", ")
        )))
    }
}

/// Fields present (by name) in both schemas, using the left definition.
///
/// Fields sharing a name must share a subtype; differing `FieldType`s are
/// reconciled in favour of the left side.
pub fn get_common_schema(left: &Schema, right: &Schema) -> Result<Vec<Field>> {
    let mut common = Vec::new();
    for lf in &left.fields {
        let Some(rf) = right.field(&lf.name) else {
            continue;
        };
        if lf.subtype != rf.subtype {
            return Err(Error::IncompatibleJoinKeys {
                left: lf.name.clone(),
                right: rf.name.clone(),
                reason: format!("{:?} vs {:?}", lf.subtype, rf.subtype),
            });
        }
        common.push(lf.clone());
    }
    Ok(common)
}
