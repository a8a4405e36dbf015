//! Row selection: narrow a model's diffset through a row predicate.
//!
//! Only surviving indices are retained. The result shares the parent's store
//! and schema.

use std::fmt;
use std::sync::Arc;

use datamodel_core::prelude::{DataModel, DiffSet, Result, Row};

use crate::context::Context;
use crate::trace;
use crate::traits::Operator;

/// Predicate over a resolved row.
pub type RowPredicate = Arc<dyn Fn(&Row<'_>) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Keep matching rows.
    #[default]
    Normal,
    /// Keep rows that do not match.
    Inverse,
    /// Split into matching and non-matching halves.
    All,
}

/// Result of `select_with_mode`. `rejected` is only present for `SelectMode::All`.
#[derive(Debug, Clone)]
pub struct Selection {
    pub selected: DataModel,
    pub rejected: Option<DataModel>,
}

/// Keep the active rows for which `predicate` holds.
pub fn select<P>(model: &DataModel, predicate: P) -> DataModel
where
    P: Fn(&Row<'_>) -> bool,
{
    let diffset = model
        .diffset()
        .filter(|index| predicate(&model.row(index)));
    model.with_diffset(diffset)
}

pub fn select_with_mode<P>(model: &DataModel, predicate: P, mode: SelectMode) -> Selection
where
    P: Fn(&Row<'_>) -> bool,
{
    match mode {
        SelectMode::Normal => Selection {
            selected: select(model, predicate),
            rejected: None,
        },
        SelectMode::Inverse => Selection {
            selected: select(model, |row| !predicate(row)),
            rejected: None,
        },
        SelectMode::All => {
            let mut kept = Vec::new();
            let mut dropped = Vec::new();
            for index in model.row_diffset_iterator() {
                if predicate(&model.row(index)) {
                    kept.push(index);
                } else {
                    dropped.push(index);
                }
            }
            Selection {
                selected: model.with_diffset(DiffSet::from_sorted(kept)),
                rejected: Some(model.with_diffset(DiffSet::from_sorted(dropped))),
            }
        }
    }
}

/// `select` as a pipeline stage.
#[derive(Clone)]
pub struct Select {
    pub predicate: RowPredicate,
    pub mode: SelectMode,
    /// Shown in reports; usually the source expression.
    pub label: String,
}

impl Select {
    pub fn new<P>(label: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(&Row<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            mode: SelectMode::Normal,
            label: label.into(),
        }
    }

    /// Inverse selection. `SelectMode::All` has no single output and behaves as `Normal` here.
    pub fn inverse(mut self) -> Self {
        self.mode = SelectMode::Inverse;
        self
    }
}

impl fmt::Debug for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("label", &self.label)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Operator for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn describe(&self) -> String {
        match self.mode {
            SelectMode::Inverse => format!("select not ({})", self.label),
            _ => format!("select {}", self.label),
        }
    }

    fn eval(&self, input: &DataModel, _ctx: &Context) -> Result<DataModel> {
        let mode = match self.mode {
            SelectMode::Inverse => SelectMode::Inverse,
            _ => SelectMode::Normal,
        };
        let out = select_with_mode(input, |row| (self.predicate)(row), mode).selected;
        trace::record(self.name(), input.len(), out.len());
        Ok(out)
    }
}
