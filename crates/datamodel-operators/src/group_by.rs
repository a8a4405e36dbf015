//! Grouping and aggregation.
//!
//! Active rows are partitioned by the tuple of dimension values (null and NaN
//! form groups of their own). Groups are emitted in order of first encounter,
//! each measure reduced by its resolved reducer. The output is a fresh store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use datamodel_core::config::DEFAULT_TEMPORAL_FORMAT;
use datamodel_core::prelude::{DataModel, Error, Field, Result, Scalar, Schema};

use crate::context::Context;
use crate::keys::{row_key, KeyIndex};
use crate::registry::{ReducerFn, ReducerRegistry};
use crate::trace;
use crate::traits::Operator;

/// Measure name → reducer name. Measures left out fall back to the field's
/// default reducer, then to the registry default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReducerSpec {
    pub reducers: BTreeMap<String, String>,
}

impl ReducerSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, measure: impl Into<String>, reducer: impl Into<String>) -> Self {
        self.reducers.insert(measure.into(), reducer.into());
        self
    }

    pub fn get(&self, measure: &str) -> Option<&str> {
        self.reducers.get(measure).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReducerSpec {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            reducers: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Group `model` by `dimensions` and aggregate every other measure.
pub fn group_by<S: AsRef<str>>(
    model: &DataModel,
    dimensions: &[S],
    spec: &ReducerSpec,
    registry: &ReducerRegistry,
) -> Result<DataModel> {
    let schema = model.schema();

    let dim_positions = dimensions
        .iter()
        .map(|d| {
            let name = d.as_ref();
            schema
                .index_of(name)
                .ok_or_else(|| Error::unknown_field(name))
        })
        .collect::<Result<Vec<_>>>()?;

    for name in spec.reducers.keys() {
        let is_measure = schema.field(name).is_some_and(|f| f.is_measure());
        if !is_measure || dim_positions.iter().any(|&p| schema.fields[p].name == *name) {
            return Err(Error::unknown_field(name.clone()));
        }
    }

    // (schema position, reducer) for each aggregated measure, in schema order.
    let measures = schema
        .fields
        .iter()
        .enumerate()
        .filter(|(pos, f)| f.is_measure() && !dim_positions.contains(pos))
        .map(|(pos, f)| Ok((pos, resolve_reducer(f, spec, registry)?)))
        .collect::<Result<Vec<(usize, &ReducerFn)>>>()?;

    let groups = partition(model, &dim_positions);

    let mut out_fields: Vec<Field> = dim_positions
        .iter()
        .map(|&p| schema.fields[p].clone())
        .collect();
    out_fields.extend(measures.iter().map(|(p, _)| schema.fields[*p].clone()));
    let out_schema = Schema::new(out_fields)?;

    let mut columns: Vec<Vec<Scalar>> = Vec::with_capacity(out_schema.len());
    for &pos in &dim_positions {
        let col = model.column_at(pos);
        columns.push(groups.iter().map(|rows| col[rows[0]].clone()).collect());
    }
    for (pos, reducer) in &measures {
        let field = &schema.fields[*pos];
        let col = model.column_at(*pos);
        let mut values = Vec::with_capacity(groups.len());
        let mut scratch = Vec::new();
        for rows in &groups {
            scratch.clear();
            scratch.extend(rows.iter().map(|&r| col[r].clone()));
            values.push(field.coerce(reducer(&scratch), DEFAULT_TEMPORAL_FORMAT));
        }
        columns.push(values);
    }

    DataModel::from_columns_with_len(out_schema, columns, groups.len())
}

fn resolve_reducer<'r>(
    field: &Field,
    spec: &ReducerSpec,
    registry: &'r ReducerRegistry,
) -> Result<&'r ReducerFn> {
    let name = spec
        .get(&field.name)
        .or(field.default_reducer.as_deref())
        .unwrap_or(registry.default_reducer());
    registry.get(name)
}

/// Physical row indices per group, groups in first-encounter order.
fn partition(model: &DataModel, positions: &[usize]) -> Vec<Vec<usize>> {
    let mut index: KeyIndex<'_, usize> = KeyIndex::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for row in model.row_diffset_iterator() {
        let key = row_key(model, positions, row);
        match index.first(&key).copied() {
            Some(g) => groups[g].push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }
    groups
}

/// `group_by` as a pipeline stage, resolving reducers through the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    pub dimensions: Vec<String>,
    pub reducers: ReducerSpec,
}

impl GroupBy {
    pub fn new<I, S>(dimensions: I, reducers: ReducerSpec) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            reducers,
        }
    }
}

impl Operator for GroupBy {
    fn name(&self) -> &'static str {
        "group_by"
    }

    fn describe(&self) -> String {
        let reducers: Vec<String> = self
            .reducers
            .reducers
            .iter()
            .map(|(m, r)| format!("{r}({m})"))
            .collect();
        if reducers.is_empty() {
            format!("group_by [{}]", self.dimensions.join(", "))
        } else {
            format!(
                "group_by [{}] {}",
                self.dimensions.join(", "),
                reducers.join(", ")
            )
        }
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        let out = group_by(input, &self.dimensions, &self.reducers, ctx.reducers())?;
        trace::record(self.name(), input.len(), out.len());
        Ok(out)
    }
}
