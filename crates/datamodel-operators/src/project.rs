//! Projection: restrict (and reorder) a model's schema.

use datamodel_core::prelude::{DataModel, Result};

use crate::context::Context;
use crate::trace;
use crate::traits::Operator;

/// Restrict `model` to `fields`, in the order given. Store and diffset are shared.
pub fn project<S: AsRef<str>>(model: &DataModel, fields: &[S]) -> Result<DataModel> {
    let schema = model.schema().project(fields)?;
    model.with_schema(schema)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub fields: Vec<String>,
}

impl Project {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn describe(&self) -> String {
        format!("project [{}]", self.fields.join(", "))
    }

    fn eval(&self, input: &DataModel, _ctx: &Context) -> Result<DataModel> {
        let out = project(input, &self.fields)?;
        trace::record(self.name(), input.len(), out.len());
        Ok(out)
    }
}
