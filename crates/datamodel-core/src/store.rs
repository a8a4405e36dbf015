//! The shared, immutable column store.
//!
//! Columns are individually reference-counted so a derived store (one extra
//! calculated column, say) shares every parent column instead of copying it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Scalar;

/// One physical column: a dense array with an entry per physical row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnStore {
    columns: Vec<Arc<Column>>,
    len: usize,
}

impl ColumnStore {
    /// Build a store; every column must have the same length and a unique name.
    /// The row count comes from the first column, so an empty store has no rows.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let len = columns.first().map(Column::len).unwrap_or(0);
        Self::with_len(columns, len)
    }

    /// Build a store of `len` rows. A store with no columns still keeps its row count.
    pub fn with_len(columns: Vec<Column>, len: usize) -> Result<Self> {
        Self::from_shared(columns.into_iter().map(Arc::new).collect(), len)
    }

    fn from_shared(columns: Vec<Arc<Column>>, len: usize) -> Result<Self> {
        for (i, col) in columns.iter().enumerate() {
            if col.len() != len {
                return Err(Error::Build(format!(
                    "column '{}' has {} rows, expected {}",
                    col.name,
                    col.len(),
                    len
                )));
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::DuplicateField(col.name.clone()));
            }
        }
        Ok(Self { columns, len })
    }

    /// Number of physical rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.as_ref())
    }

    pub fn column_at(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx).map(|c| c.as_ref())
    }

    /// A new store holding every column of `self` plus `column`.
    ///
    /// The parent store is untouched. A same-named column is shadowed in the new
    /// store, which happens when a schema has projected that name away.
    pub fn with_column(&self, column: Column) -> Result<Self> {
        let mut columns: Vec<Arc<Column>> = self
            .columns
            .iter()
            .filter(|c| c.name != column.name)
            .cloned()
            .collect();
        columns.push(Arc::new(column));
        Self::from_shared(columns, self.len)
    }

    /// True when `other` shares the column buffer for `name` with `self`.
    pub fn shares_column(&self, other: &ColumnStore, name: &str) -> bool {
        let a = self.columns.iter().find(|c| c.name == name);
        let b = other.columns.iter().find(|c| c.name == name);
        matches!((a, b), (Some(a), Some(b)) if Arc::ptr_eq(a, b))
    }
}
