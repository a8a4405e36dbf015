//! Join engine: natural, left/right/full outer joins and the cross product.
//!
//! Every join is the cross product filtered by a condition. Equality
//! conditions (`Natural`, `On`) are evaluated as hash joins; `Predicate`
//! conditions enumerate the cross product. Key equality treats null as equal
//! to null, as `natural_join_filter` does.
//!
//! The output is materialized into a fresh store: left fields, then right
//! fields, with same-named key pairs collapsed into one column.

mod layout;
mod probe;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use datamodel_core::prelude::{DataModel, Error, Result, Row, Scalar, Schema};
use datamodel_core::schema::get_common_schema;

use crate::context::Context;
use crate::trace;
use crate::traits::Operator;

use layout::{layout, Source};
use probe::{pair_up, Matcher};

/// Predicate over a (left row, right row) pair.
pub type JoinPredicate = Arc<dyn Fn(&Row<'_>, &Row<'_>) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    /// Every pair; the condition is ignored.
    Cross,
}

#[derive(Clone)]
pub enum JoinCondition {
    /// Equality on every field name the two schemas share.
    Natural,
    /// Equality on explicit (left field, right field) pairs.
    On(Vec<(String, String)>),
    Predicate(JoinPredicate),
}

impl JoinCondition {
    pub fn on<L: Into<String>, R: Into<String>>(pairs: impl IntoIterator<Item = (L, R)>) -> Self {
        JoinCondition::On(
            pairs
                .into_iter()
                .map(|(l, r)| (l.into(), r.into()))
                .collect(),
        )
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Row<'_>, &Row<'_>) -> bool + Send + Sync + 'static,
    {
        JoinCondition::Predicate(Arc::new(f))
    }
}

impl fmt::Debug for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCondition::Natural => f.write_str("Natural"),
            JoinCondition::On(pairs) => f.debug_tuple("On").field(pairs).finish(),
            JoinCondition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Prefixes used to rename colliding non-key fields to `"{alias}.{name}"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOptions {
    pub left_alias: Option<String>,
    pub right_alias: Option<String>,
}

impl JoinOptions {
    pub fn aliased(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left_alias: Some(left.into()),
            right_alias: Some(right.into()),
        }
    }
}

/// Resolve the condition into key position pairs, validating names and subtypes.
fn key_positions(
    left: &Schema,
    right: &Schema,
    condition: &JoinCondition,
) -> Result<Vec<(usize, usize)>> {
    match condition {
        JoinCondition::Natural => get_common_schema(left, right)?
            .iter()
            .map(|f| {
                let lp = left.index_of(&f.name);
                let rp = right.index_of(&f.name);
                lp.zip(rp).ok_or_else(|| Error::unknown_field(f.name.clone()))
            })
            .collect(),
        JoinCondition::On(pairs) => pairs
            .iter()
            .map(|(l, r)| {
                let lf = left.require(l)?;
                let rf = right.require(r)?;
                if lf.subtype != rf.subtype {
                    return Err(Error::IncompatibleJoinKeys {
                        left: l.clone(),
                        right: r.clone(),
                        reason: format!("{:?} vs {:?}", lf.subtype, rf.subtype),
                    });
                }
                let lp = left.index_of(l).unwrap_or_default();
                let rp = right.index_of(r).unwrap_or_default();
                Ok((lp, rp))
            })
            .collect(),
        JoinCondition::Predicate(_) => Ok(Vec::new()),
    }
}

/// Join `left` and `right` under `condition` with the row preservation of `kind`.
pub fn join(
    left: &DataModel,
    right: &DataModel,
    kind: JoinKind,
    condition: &JoinCondition,
    options: &JoinOptions,
) -> Result<DataModel> {
    let keys = match kind {
        JoinKind::Cross => Vec::new(),
        _ => key_positions(left.schema(), right.schema(), condition)?,
    };
    let plan = layout(left.schema(), right.schema(), &keys, options)?;

    let left_keys: Vec<usize> = keys.iter().map(|&(l, _)| l).collect();
    let right_keys: Vec<usize> = keys.iter().map(|&(_, r)| r).collect();
    let predicate = match (kind, condition) {
        (JoinKind::Cross, _) => None,
        (_, JoinCondition::Predicate(p)) => Some(p),
        _ => None,
    };
    let left_right =
        |l: usize, r: usize| predicate.is_some_and(|p| p(&left.row(l), &right.row(r)));
    let right_left = |r: usize, l: usize| left_right(l, r);

    let (lr, rl) = match predicate {
        Some(_) => (
            Matcher::Predicate(&left_right),
            Matcher::Predicate(&right_left),
        ),
        None => (
            Matcher::Keys {
                outer: &left_keys,
                inner: &right_keys,
            },
            Matcher::Keys {
                outer: &right_keys,
                inner: &left_keys,
            },
        ),
    };

    let pairs: Vec<(Option<usize>, Option<usize>)> = match kind {
        JoinKind::Inner | JoinKind::Cross => pair_up(left, right, &lr, false)
            .into_iter()
            .map(|(l, r)| (Some(l), r))
            .collect(),
        JoinKind::LeftOuter => pair_up(left, right, &lr, true)
            .into_iter()
            .map(|(l, r)| (Some(l), r))
            .collect(),
        JoinKind::RightOuter => pair_up(right, left, &rl, true)
            .into_iter()
            .map(|(r, l)| (l, Some(r)))
            .collect(),
        JoinKind::FullOuter => {
            let mut pairs: Vec<(Option<usize>, Option<usize>)> = pair_up(left, right, &lr, true)
                .into_iter()
                .map(|(l, r)| (Some(l), r))
                .collect();
            let matched: HashSet<usize> = pairs.iter().filter_map(|&(_, r)| r).collect();
            pairs.extend(
                right
                    .row_diffset_iterator()
                    .filter(|r| !matched.contains(r))
                    .map(|r| (None, Some(r))),
            );
            pairs
        }
    };

    let columns = plan
        .sources
        .iter()
        .map(|source| materialize(left, right, *source, &pairs))
        .collect();
    let out = DataModel::from_columns_with_len(plan.schema, columns, pairs.len())?;
    trace::record("join", left.len() + right.len(), out.len());
    Ok(out)
}

fn materialize(
    left: &DataModel,
    right: &DataModel,
    source: Source,
    pairs: &[(Option<usize>, Option<usize>)],
) -> Vec<Scalar> {
    let pick = |col: &[Scalar], row: Option<usize>| row.map(|i| col[i].clone());
    match source {
        Source::Left(p) => {
            let col = left.column_at(p);
            pairs
                .iter()
                .map(|&(l, _)| pick(col, l).unwrap_or(Scalar::Null))
                .collect()
        }
        Source::Right(p) => {
            let col = right.column_at(p);
            pairs
                .iter()
                .map(|&(_, r)| pick(col, r).unwrap_or(Scalar::Null))
                .collect()
        }
        Source::Coalesce(lp, rp) => {
            let (lcol, rcol) = (left.column_at(lp), right.column_at(rp));
            pairs
                .iter()
                .map(|&(l, r)| {
                    pick(lcol, l)
                        .or_else(|| pick(rcol, r))
                        .unwrap_or(Scalar::Null)
                })
                .collect()
        }
    }
}

/// Inner join on every shared field name.
pub fn natural_join(left: &DataModel, right: &DataModel) -> Result<DataModel> {
    join(
        left,
        right,
        JoinKind::Inner,
        &JoinCondition::Natural,
        &JoinOptions::default(),
    )
}

pub fn left_outer_join(
    left: &DataModel,
    right: &DataModel,
    condition: &JoinCondition,
) -> Result<DataModel> {
    join(left, right, JoinKind::LeftOuter, condition, &JoinOptions::default())
}

pub fn right_outer_join(
    left: &DataModel,
    right: &DataModel,
    condition: &JoinCondition,
) -> Result<DataModel> {
    join(left, right, JoinKind::RightOuter, condition, &JoinOptions::default())
}

pub fn full_outer_join(
    left: &DataModel,
    right: &DataModel,
    condition: &JoinCondition,
) -> Result<DataModel> {
    join(left, right, JoinKind::FullOuter, condition, &JoinOptions::default())
}

/// Every left row paired with every right row.
pub fn cross_product(
    left: &DataModel,
    right: &DataModel,
    options: &JoinOptions,
) -> Result<DataModel> {
    join(left, right, JoinKind::Cross, &JoinCondition::Natural, options)
}

/// Row-pair predicate that holds when every field shared by the two schemas is
/// key-equal. `join` with `JoinCondition::Natural` computes the same matches by hashing.
pub fn natural_join_filter(left: &Schema, right: &Schema) -> Result<JoinPredicate> {
    let names: Vec<String> = get_common_schema(left, right)?
        .into_iter()
        .map(|f| f.name)
        .collect();
    Ok(Arc::new(move |l: &Row<'_>, r: &Row<'_>| {
        names.iter().all(|n| l.value(n).key_eq(r.value(n)))
    }))
}

/// A join against a fixed right-hand model, as a pipeline stage.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub condition: JoinCondition,
    pub options: JoinOptions,
    pub right: DataModel,
    /// Shown in reports, e.g. the source name of `right`.
    pub label: String,
}

impl Join {
    pub fn new(kind: JoinKind, right: DataModel, label: impl Into<String>) -> Self {
        Self {
            kind,
            condition: JoinCondition::Natural,
            options: JoinOptions::default(),
            right,
            label: label.into(),
        }
    }

    pub fn with_condition(mut self, condition: JoinCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_options(mut self, options: JoinOptions) -> Self {
        self.options = options;
        self
    }
}

impl Operator for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn describe(&self) -> String {
        let kind = match self.kind {
            JoinKind::Inner => "inner",
            JoinKind::LeftOuter => "left outer",
            JoinKind::RightOuter => "right outer",
            JoinKind::FullOuter => "full outer",
            JoinKind::Cross => "cross",
        };
        match (&self.kind, &self.condition) {
            (JoinKind::Cross, _) => format!("cross join {}", self.label),
            (_, JoinCondition::On(pairs)) => {
                let on: Vec<String> = pairs.iter().map(|(l, r)| format!("{l}={r}")).collect();
                format!("{kind} join {} on {}", self.label, on.join(", "))
            }
            (_, JoinCondition::Natural) => format!("natural {kind} join {}", self.label),
            (_, JoinCondition::Predicate(_)) => format!("{kind} join {} on predicate", self.label),
        }
    }

    fn eval(&self, input: &DataModel, _ctx: &Context) -> Result<DataModel> {
        join(input, &self.right, self.kind, &self.condition, &self.options)
    }
}
