//! Reducer registry: named aggregation functions consumed by `group_by`.
//!
//! The registry is an ordinary value owned by a `Context`, not process-wide
//! state. Built-ins are installed by `with_builtins`; callers add their own
//! with `def_reducer`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use datamodel_core::prelude::{Error, Result, Scalar};

/// A pure aggregation: group values (in row order) → one scalar.
pub type ReducerFn = Arc<dyn Fn(&[Scalar]) -> Scalar + Send + Sync>;

pub const DEFAULT_REDUCER: &str = "sum";

#[derive(Clone)]
pub struct ReducerRegistry {
    reducers: HashMap<String, ReducerFn>,
    default: String,
}

impl ReducerRegistry {
    /// A registry with no reducers at all.
    pub fn empty() -> Self {
        Self {
            reducers: HashMap::new(),
            default: DEFAULT_REDUCER.to_string(),
        }
    }

    /// sum, avg, first, last, count, min, max, std.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.def_reducer("sum", builtins::sum);
        reg.def_reducer("avg", builtins::avg);
        reg.def_reducer("first", builtins::first);
        reg.def_reducer("last", builtins::last);
        reg.def_reducer("count", builtins::count);
        reg.def_reducer("min", builtins::min);
        reg.def_reducer("max", builtins::max);
        reg.def_reducer("std", builtins::std);
        reg
    }

    /// Register (or replace) a reducer. Returns the one it replaced, if any.
    pub fn def_reducer<F>(&mut self, name: impl Into<String>, f: F) -> Option<ReducerFn>
    where
        F: Fn(&[Scalar]) -> Scalar + Send + Sync + 'static,
    {
        self.reducers.insert(name.into(), Arc::new(f))
    }

    pub fn get(&self, name: &str) -> Result<&ReducerFn> {
        self.reducers
            .get(name)
            .ok_or_else(|| Error::UnknownReducer(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.reducers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Reducer used for measures nobody named one for.
    pub fn default_reducer(&self) -> &str {
        &self.default
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default = name.into();
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerRegistry")
            .field("reducers", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

/// Built-in reducers. Nulls are skipped except by `first`/`last`; an all-null
/// group reduces to `Null` (`count` to zero).
pub mod builtins {
    use std::cmp::Ordering;

    use datamodel_core::prelude::Scalar;
    use datamodel_core::types::scalar_cmp;

    fn numbers(values: &[Scalar]) -> impl Iterator<Item = f64> + '_ {
        values.iter().filter_map(|v| v.as_f64())
    }

    pub fn sum(values: &[Scalar]) -> Scalar {
        let mut any = false;
        let total = numbers(values).fold(0.0, |acc, v| {
            any = true;
            acc + v
        });
        if any {
            Scalar::F64(total)
        } else {
            Scalar::Null
        }
    }

    pub fn avg(values: &[Scalar]) -> Scalar {
        let (total, n) = numbers(values).fold((0.0, 0usize), |(t, n), v| (t + v, n + 1));
        if n == 0 {
            Scalar::Null
        } else {
            Scalar::F64(total / n as f64)
        }
    }

    pub fn first(values: &[Scalar]) -> Scalar {
        values.first().cloned().unwrap_or(Scalar::Null)
    }

    pub fn last(values: &[Scalar]) -> Scalar {
        values.last().cloned().unwrap_or(Scalar::Null)
    }

    pub fn count(values: &[Scalar]) -> Scalar {
        Scalar::I64(values.iter().filter(|v| !v.is_null()).count() as i64)
    }

    fn extreme(values: &[Scalar], want: Ordering) -> Scalar {
        values
            .iter()
            .filter(|v| !v.is_null())
            .fold(None::<&Scalar>, |best, v| match best {
                Some(b) if scalar_cmp(v, b) != want => Some(b),
                _ => Some(v),
            })
            .cloned()
            .unwrap_or(Scalar::Null)
    }

    pub fn min(values: &[Scalar]) -> Scalar {
        extreme(values, Ordering::Less)
    }

    pub fn max(values: &[Scalar]) -> Scalar {
        extreme(values, Ordering::Greater)
    }

    /// Population standard deviation.
    pub fn std(values: &[Scalar]) -> Scalar {
        let xs: Vec<f64> = numbers(values).collect();
        if xs.is_empty() {
            return Scalar::Null;
        }
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        Scalar::F64(var.sqrt())
    }
}
