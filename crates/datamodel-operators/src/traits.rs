//! Operator trait shared by every pipeline stage.
//!
//! Each operator module exposes a plain function (`select`, `group_by`, ...) and a
//! struct implementing `Operator` that carries its arguments, so the same logic
//! runs standalone or inside a `compose`d pipeline.

use datamodel_core::prelude::{DataModel, Result};

use crate::context::Context;

/// A unary DataModel → DataModel stage.
///
/// Invariants:
/// - `eval` never mutates its input; it returns a new model that may share the
///   input's column store.
/// - `eval` is deterministic given the same input and context.
pub trait Operator: Send + Sync {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// One-line description used by pipeline reports.
    fn describe(&self) -> String {
        self.name().to_string()
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel>;
}

impl<T: Operator + ?Sized> Operator for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        (**self).eval(input, ctx)
    }
}
