//! Binning: bucket a continuous field into a derived categorical field.
//!
//! Buckets are half-open `[lo, hi)` except the last, which is closed. Values
//! outside the boundaries get the configured out-of-range label; nulls and NaN
//! stay null.

use serde::{Deserialize, Serialize};

use datamodel_core::prelude::{
    DataModel, EngineConfig, Error, Field, FieldSubtype, FieldType, Result, Scalar,
};
use datamodel_core::store::Column;

use crate::context::Context;
use crate::trace;
use crate::traits::Operator;

/// Upper bound on generated buckets; guards against a tiny `size` over a wide range.
const MAX_BINS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinStrategy {
    /// Equal-width buckets of `size`. `start`/`end` default to the field's min/max.
    Size {
        size: f64,
        start: Option<f64>,
        end: Option<f64>,
    },
    /// `count` equal-width buckets between `start` and `end`.
    Count {
        count: usize,
        start: Option<f64>,
        end: Option<f64>,
    },
    /// Explicit, strictly increasing boundaries.
    Boundaries(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinConfig {
    /// Output field name; `"{field}_binned"` when unset.
    pub name: Option<String>,
    pub strategy: BinStrategy,
    pub out_of_range_label: String,
}

impl BinConfig {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            name: None,
            strategy: BinStrategy::Count {
                count: cfg.default_bin_count,
                start: None,
                end: None,
            },
            out_of_range_label: cfg.out_of_range_label.clone(),
        }
    }

    pub fn with_strategy(mut self, strategy: BinStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Default for BinConfig {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Bucket label for every physical row of `model` (inactive rows are `Null`).
pub fn create_binned_field_data(
    model: &DataModel,
    field: &str,
    config: &BinConfig,
) -> Result<Vec<Scalar>> {
    let source = model.schema().require(field)?;
    if source.subtype != FieldSubtype::Continuous {
        return Err(Error::NonContinuousField(field.to_string()));
    }
    let column = model.column(field).unwrap_or(&[]);

    let mut values = vec![Scalar::Null; model.store().len()];
    let active = model
        .row_diffset_iterator()
        .filter_map(|i| finite(&column[i]).map(|v| (i, v)));
    let extent = active.clone().map(|(_, v)| v);
    let Some(boundaries) = resolve_boundaries(&config.strategy, extent)? else {
        // nothing to bin
        return Ok(values);
    };
    let labels: Vec<Scalar> = boundaries
        .windows(2)
        .map(|w| Scalar::Str(format!("{}-{}", fmt_bound(w[0]), fmt_bound(w[1]))))
        .collect();

    for (i, v) in active {
        values[i] = match bucket_of(&boundaries, v) {
            Some(b) => labels[b].clone(),
            None => Scalar::Str(config.out_of_range_label.clone()),
        };
    }
    Ok(values)
}

/// Append the binned field for `field` to `model`.
pub fn bin(model: &DataModel, field: &str, config: &BinConfig) -> Result<DataModel> {
    let values = create_binned_field_data(model, field, config)?;
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| format!("{field}_binned"));
    let out_field = Field::new(name.clone(), FieldType::Dimension, FieldSubtype::Categorical);
    let schema = model.schema().with_field(out_field)?;
    let store = model.store().with_column(Column::new(name, values))?;
    model.with_store(store, schema)
}

fn finite(value: &Scalar) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

/// Resolve a strategy into boundaries. `None` when open bounds meet no values.
fn resolve_boundaries<I>(strategy: &BinStrategy, values: I) -> Result<Option<Vec<f64>>>
where
    I: Iterator<Item = f64>,
{
    let extent = || {
        values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    };

    match strategy {
        BinStrategy::Boundaries(b) => {
            if b.len() < 2 || b.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidBinConfig(
                    "need at least two finite boundaries".into(),
                ));
            }
            if b.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidBinConfig(
                    "boundaries must be strictly increasing".into(),
                ));
            }
            Ok(Some(b.clone()))
        }
        BinStrategy::Size { size, start, end } => {
            if !(size.is_finite() && *size > 0.0) {
                return Err(Error::InvalidBinConfig(format!("bin size {size} must be positive")));
            }
            let Some((start, end)) = resolve_range(*start, *end, extent) else {
                return Ok(None);
            };
            let span = (end - start).max(0.0);
            let raw = (span / size).ceil();
            if !raw.is_finite() || raw > MAX_BINS as f64 {
                return Err(Error::InvalidBinConfig(format!(
                    "bin size {size} over [{start}, {end}] yields too many buckets"
                )));
            }
            let count = (raw as usize).max(1);
            // `end` itself must land inside the closed last bucket.
            let count = if start + count as f64 * size < end {
                count + 1
            } else {
                count
            };
            if count > MAX_BINS {
                return Err(Error::InvalidBinConfig(format!(
                    "bin size {size} yields {count} buckets"
                )));
            }
            Ok(Some((0..=count).map(|i| start + i as f64 * size).collect()))
        }
        BinStrategy::Count { count, start, end } => {
            if *count == 0 || *count > MAX_BINS {
                return Err(Error::InvalidBinConfig(format!(
                    "bin count {count} out of range"
                )));
            }
            let Some((start, end)) = resolve_range(*start, *end, extent) else {
                return Ok(None);
            };
            if !(end - start).is_finite() {
                return Err(Error::InvalidBinConfig(format!(
                    "bin range [{start}, {end}] is not finite"
                )));
            }
            if end <= start {
                // Degenerate range: one unit-wide bucket.
                return Ok(Some(vec![start, start + 1.0]));
            }
            let width = (end - start) / *count as f64;
            let mut b: Vec<f64> = (0..*count).map(|i| start + i as f64 * width).collect();
            b.push(end);
            Ok(Some(b))
        }
    }
}

fn resolve_range<F>(start: Option<f64>, end: Option<f64>, extent: F) -> Option<(f64, f64)>
where
    F: FnOnce() -> Option<(f64, f64)>,
{
    match (start, end) {
        (Some(s), Some(e)) => Some((s, e)),
        (s, e) => {
            let (lo, hi) = extent()?;
            Some((s.unwrap_or(lo), e.unwrap_or(hi)))
        }
    }
}

/// Index of the bucket holding `v`, or `None` when out of range.
fn bucket_of(boundaries: &[f64], v: f64) -> Option<usize> {
    let (first, last) = (boundaries[0], boundaries[boundaries.len() - 1]);
    if v < first || v > last {
        return None;
    }
    if v == last {
        return Some(boundaries.len() - 2);
    }
    Some(boundaries.partition_point(|b| *b <= v) - 1)
}

fn fmt_bound(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// `bin` as a pipeline stage. Unset parts of the config come from the context.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub field: String,
    pub name: Option<String>,
    pub strategy: Option<BinStrategy>,
}

impl Bin {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: None,
            strategy: None,
        }
    }

    fn config(&self, ctx: &Context) -> BinConfig {
        let mut config = BinConfig::from_config(&ctx.config);
        config.name = self.name.clone();
        if let Some(strategy) = &self.strategy {
            config.strategy = strategy.clone();
        }
        config
    }
}

impl Operator for Bin {
    fn name(&self) -> &'static str {
        "bin"
    }

    fn describe(&self) -> String {
        format!("bin {}", self.field)
    }

    fn eval(&self, input: &DataModel, ctx: &Context) -> Result<DataModel> {
        let out = bin(input, &self.field, &self.config(ctx))?;
        trace::record(self.name(), input.len(), out.len());
        Ok(out)
    }
}
