#![forbid(unsafe_code)]
//! datamodel-operators: relational operators over immutable DataModels.
//!
//! Design intent:
//! - Every operator takes one or two `DataModel`s and returns a new one; inputs
//!   are never mutated.
//! - View operators (`select`, `difference`, `project`) and column-adding ones
//!   (`calculate_variable`, `bin`) share the parent's column store.
//!   Operators producing new values (`group_by`, `sort`, joins, `union`)
//!   materialize a fresh store.
//! - Each operator is a plain function plus an `Operator` struct, so it can run
//!   standalone or inside a `compose`d `Pipeline`.
//! - Reducers live in a `ReducerRegistry` owned by the `Context`, never in
//!   process-wide state.

pub mod context;
pub mod registry;
pub mod traits;

pub mod bin;
pub mod calculate;
pub mod compose;
pub mod group_by;
pub mod join;
pub mod project;
pub mod select;
pub mod set_ops;
pub mod sort;

mod keys;
mod trace;

pub use bin::{bin, create_binned_field_data, Bin, BinConfig, BinStrategy};
pub use calculate::{calculate_variable, CalculateVariable};
pub use compose::{compose, Pipeline, PipelineReport, StageReport};
pub use context::Context;
pub use group_by::{group_by, GroupBy, ReducerSpec};
pub use join::{
    cross_product, full_outer_join, join, left_outer_join, natural_join, natural_join_filter,
    right_outer_join, Join, JoinCondition, JoinKind, JoinOptions,
};
pub use project::{project, Project};
pub use registry::{ReducerFn, ReducerRegistry};
pub use select::{select, select_with_mode, Select, SelectMode, Selection};
pub use set_ops::{difference, union, SetOp, SetOpKind};
pub use sort::{merge_sort, sort, Sort, SortKey, SortOrder};
pub use traits::Operator;
