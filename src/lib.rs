// I don't really care, and it's not important for this project
#![allow(clippy::result_large_err)]

pub mod cache;
pub mod context;
mod engine;
mod error;
pub mod saved;

pub use engine::{
    build_query, execute, export_csv, render_columns, render_neighbors, render_preview,
    render_results, write_csv, Aggregate, Cell, ColumnSelection, CompiledQuery, ExecutionError,
    Filter, JoinStrategy, Operator, OrderBy, OrderDirection, ParseEnumError, QualifiedColumn,
    QueryBuildError, ResultSet, SelectionError, SelectionState, Session, Toggle, DEFAULT_LIMIT,
};

/// Reading the structure of the store.
pub mod analyze {
    pub use crate::engine::sql::querying::{
        analyze, sqlite, Analyzer, Connection, SAMPLE_VALUES_LIMIT,
    };
    pub use crate::engine::sql::structure::*;
    pub use crate::engine::Introspective;
}

pub use error::{Error, ErrorKind, InternalError};
