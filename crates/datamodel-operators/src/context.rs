//! Engine context: configuration plus the reducer registry.
//!
//! Created once per engine (or per test) and passed to every pipeline run, so
//! reducer registrations never leak between independent users.

use datamodel_core::prelude::{EngineConfig, Scalar};

use crate::registry::{ReducerFn, ReducerRegistry};

#[derive(Debug, Clone)]
pub struct Context {
    pub config: EngineConfig,
    reducers: ReducerRegistry,
}

impl Context {
    pub fn new(config: EngineConfig) -> Self {
        let mut reducers = ReducerRegistry::with_builtins();
        reducers.set_default(config.default_reducer.clone());
        Self { config, reducers }
    }

    pub fn reducers(&self) -> &ReducerRegistry {
        &self.reducers
    }

    /// Register a custom reducer for later `group_by` calls through this context.
    pub fn def_reducer<F>(&mut self, name: impl Into<String>, f: F) -> Option<ReducerFn>
    where
        F: Fn(&[Scalar]) -> Scalar + Send + Sync + 'static,
    {
        self.reducers.def_reducer(name, f)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
