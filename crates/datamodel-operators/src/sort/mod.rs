//! Multi-key stable sort.
//!
//! Active row indices are merge-sorted by the keys left to right, then gathered
//! into a fresh store in that order. Rows comparing equal on every key keep
//! their relative order.

pub mod merge;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use datamodel_core::prelude::{DataModel, Result, Scalar};
use datamodel_core::types::scalar_cmp;

use crate::context::Context;
use crate::trace;
use crate::traits::Operator;

pub use merge::merge_sort;

/// Custom ordering over two field values.
pub type ValueComparator = Arc<dyn Fn(&Scalar, &Scalar) -> Ordering + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
    /// Replaces the natural value order when set. `order` still applies on top.
    pub comparator: Option<ValueComparator>,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
            comparator: None,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            order: SortOrder::Desc,
            ..Self::asc(field)
        }
    }

    pub fn with_comparator<F>(mut self, cmp: F) -> Self
    where
        F: Fn(&Scalar, &Scalar) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(cmp));
        self
    }

    fn compare(&self, a: &Scalar, b: &Scalar) -> Ordering {
        let ord = match &self.comparator {
            Some(cmp) => cmp(a, b),
            None => scalar_cmp(a, b),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKey")
            .field("field", &self.field)
            .field("order", &self.order)
            .field("custom", &self.comparator.is_some())
            .finish()
    }
}

/// Active physical indices of `model`, stably ordered by `keys`.
pub fn sorted_indices(model: &DataModel, keys: &[SortKey]) -> Result<Vec<usize>> {
    let columns = keys
        .iter()
        .map(|k| {
            model
                .schema()
                .require(&k.field)
                .map(|_| model.column(&k.field).unwrap_or(&[]))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut indices: Vec<usize> = model.row_diffset_iterator().collect();
    if keys.is_empty() {
        return Ok(indices);
    }
    merge_sort(&mut indices, |&a, &b| {
        for (key, col) in keys.iter().zip(columns.iter()) {
            match key.compare(&col[a], &col[b]) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    });
    Ok(indices)
}

/// Reorder `model` by `keys`. With no keys the model is returned as is.
pub fn sort(model: &DataModel, keys: &[SortKey]) -> Result<DataModel> {
    if keys.is_empty() {
        return Ok(model.clone());
    }
    let indices = sorted_indices(model, keys)?;
    model.gather(&indices)
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub keys: Vec<SortKey>,
}

impl Sort {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }
}

impl Operator for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn describe(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|k| match k.order {
                SortOrder::Asc => k.field.clone(),
                SortOrder::Desc => format!("{} desc", k.field),
            })
            .collect();
        format!("sort by {}", keys.join(", "))
    }

    fn eval(&self, input: &DataModel, _ctx: &Context) -> Result<DataModel> {
        let out = sort(input, &self.keys)?;
        trace::record(self.name(), input.len(), out.len());
        Ok(out)
    }
}
