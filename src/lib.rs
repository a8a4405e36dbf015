#![forbid(unsafe_code)]
//! datamodel: immutable, schema-aware tables and the relational operators over them.
//!
//! This crate re-exports the workspace members:
//! - [`datamodel_core`]: fields, schemas, the column store, diffsets, `DataModel`
//! - [`datamodel_operators`]: select/project/sort/bin/group-by, set algebra, joins, compose
//! - [`datamodel_planner`]: YAML pipeline documents and their lowering
//! - [`datamodel_io`]: CSV/JSON readers and writers

pub use datamodel_core;
pub use datamodel_io;
pub use datamodel_operators;
pub use datamodel_planner;

pub mod prelude {
    pub use datamodel_core::prelude::*;
    pub use datamodel_operators::{
        bin, calculate_variable, compose, cross_product, difference, full_outer_join, group_by,
        join, left_outer_join, natural_join, project, right_outer_join, select, sort, union,
        Bin, BinConfig, BinStrategy, CalculateVariable, Context, GroupBy, Join, JoinCondition,
        JoinKind, JoinOptions, Operator, Pipeline, Project, ReducerRegistry, ReducerSpec, Select,
        SetOp, Sort, SortKey, SortOrder,
    };
}
