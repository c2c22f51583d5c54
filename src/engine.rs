mod executor;
mod export;
mod query_builder;
mod rendering;
mod selection;
mod session;
/// Provides helpful data from the database
pub mod sql;


pub use executor::{execute, Cell, ExecutionError, ResultSet};
pub use export::{export_csv, write_csv};
pub use query_builder::{build_query, CompiledQuery, Introspective, QueryBuildError};
pub use rendering::{render_columns, render_neighbors, render_preview, render_results};
pub use selection::{
    ColumnSelection, Filter, OrderBy, SelectionError, SelectionState, Toggle, DEFAULT_LIMIT,
};
pub use session::Session;

use crate::engine::sql::structure::{ColumnName, TableName};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A column prefixed with the table it belongs to, like `crops.crop_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedColumn {
    pub table: TableName,
    pub column: ColumnName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    GreaterThan,
    LesserThan,
    GreaterOrEqual,
    LesserOrEqual,
    Like,
    In,
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    #[default]
    AllRows,
    CountOnly,
}

/// How the query builder decides on the ON clause between two consecutive tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinStrategy {
    /// Join on the first column name both tables have in common, or cross join if there is none.
    #[default]
    SharedColumn,
    /// Use declared foreign keys between the two tables, and only fall back to
    /// [`JoinStrategy::SharedColumn`] when there are none.
    ForeignKeys,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Equals,
        Operator::GreaterThan,
        Operator::LesserThan,
        Operator::GreaterOrEqual,
        Operator::LesserOrEqual,
        Operator::Like,
        Operator::In,
        Operator::Between,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::GreaterThan => ">",
            Operator::LesserThan => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LesserOrEqual => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::Between => "BETWEEN",
        }
    }
}

impl OrderDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASC",
            OrderDirection::Descending => "DESC",
        }
    }
}

impl QualifiedColumn {
    pub fn new<T, C>(table: T, column: C) -> Self
    where
        T: Into<TableName>,
        C: Into<ColumnName>,
    {
        QualifiedColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid value here")]
pub struct ParseEnumError(pub String);

impl FromStr for Operator {
    type Err = ParseEnumError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();

        Operator::ALL
            .into_iter()
            .find(|operator| operator.symbol().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseEnumError(input.to_string()))
    }
}

impl FromStr for OrderDirection {
    type Err = ParseEnumError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Ascending),
            "DESC" => Ok(OrderDirection::Descending),
            _ => Err(ParseEnumError(input.to_string())),
        }
    }
}

/// Parses `table.column`. Only the first dot splits, column names are taken as they are.
impl FromStr for QualifiedColumn {
    type Err = ParseEnumError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(QualifiedColumn::new(table, column))
            }
            _ => Err(ParseEnumError(input.to_string())),
        }
    }
}

impl Display for QualifiedColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Display for OrderDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

#[cfg(test)]
mod enum_tests {
    use super::*;

    #[test]
    fn operators_parse_case_insensitively() {
        assert_eq!(Ok(Operator::Like), "like".parse());
        assert_eq!(Ok(Operator::GreaterOrEqual), " >= ".parse());
        assert_eq!(Ok(Operator::Between), "Between".parse());
        assert!("!=".parse::<Operator>().is_err());
    }

    #[test]
    fn qualified_columns_split_on_first_dot() {
        let column: QualifiedColumn = "crops.crop_name".parse().unwrap();

        assert_eq!(QualifiedColumn::new("crops", "crop_name"), column);
        assert_eq!("crops.crop_name", column.to_string());
        assert!("crop_name".parse::<QualifiedColumn>().is_err());
        assert!(".crop_name".parse::<QualifiedColumn>().is_err());
    }
}
