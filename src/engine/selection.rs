//! The user's query under construction.
//!
//! Every mutation goes through a method that checks the schema snapshot first, so a selection
//! never points at tables or columns that don't exist. Removing a table takes all references to
//! it along.
use crate::engine::sql::structure::{ColumnName, Database, TableName};
use crate::engine::{Aggregate, OrderDirection, Operator, QualifiedColumn};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Used when the user did not set a limit, or typed something that is not a positive number.
pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Order matters, it's the join order.
    tables: Vec<TableName>,
    columns: BTreeMap<TableName, ColumnSelection>,
    filters: Vec<Filter>,
    group_by: Vec<QualifiedColumn>,
    order_by: Vec<OrderBy>,
    aggregate: Aggregate,
    /// Kept as typed, it only gets interpreted when building.
    limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnSelection {
    All,
    /// In the order the user picked them.
    Columns(Vec<ColumnName>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: QualifiedColumn,
    pub operator: Operator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: QualifiedColumn,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Unknown table '{0}'")]
    UnknownTable(TableName),
    #[error("Unknown column '{0}'")]
    UnknownColumn(QualifiedColumn),
    #[error("Please fill all filter fields: table, column, operator and value")]
    IncompleteFilter,
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),
}

type Result<T> = std::result::Result<T, SelectionError>;

static LIMIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new("^[0-9]+$").unwrap());

impl SelectionState {
    pub fn new() -> Self {
        SelectionState::default()
    }

    pub fn tables(&self) -> &[TableName] {
        &self.tables
    }

    pub fn is_selected(&self, table: &TableName) -> bool {
        self.tables.contains(table)
    }

    /// Tables nobody configured select everything.
    pub fn column_selection(&self, table: &TableName) -> &ColumnSelection {
        self.columns.get(table).unwrap_or(&ColumnSelection::All)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn group_by(&self) -> &[QualifiedColumn] {
        &self.group_by
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn aggregate(&self) -> Aggregate {
        self.aggregate
    }

    /// The limit that ends up in the query.
    pub fn limit(&self) -> u64 {
        self.limit
            .as_deref()
            .filter(|limit| LIMIT_REGEX.is_match(limit))
            .and_then(|limit| limit.parse::<u64>().ok())
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
    }

    /// Adds the table if it's not selected, removes it otherwise.
    pub fn toggle_table(&mut self, schema: &Database, table: &TableName) -> Result<Toggle> {
        if self.is_selected(table) {
            self.remove_table(table);

            return Ok(Toggle::Removed);
        }

        if schema.table(table).is_none() {
            return Err(SelectionError::UnknownTable(table.clone()));
        }

        self.tables.push(table.clone());
        self.columns.insert(table.clone(), ColumnSelection::All);

        Ok(Toggle::Added)
    }

    fn remove_table(&mut self, table: &TableName) {
        let filters_before = self.filters.len();

        self.tables.retain(|selected| selected != table);
        self.columns.remove(table);
        self.filters.retain(|filter| &filter.column.table != table);
        self.group_by.retain(|column| &column.table != table);
        self.order_by.retain(|order| &order.column.table != table);

        debug!(
            "removed {table}, dropping {} filters",
            filters_before - self.filters.len()
        );
    }

    pub fn set_column_selection(
        &mut self,
        schema: &Database,
        table: &TableName,
        selection: ColumnSelection,
    ) -> Result<()> {
        if !self.is_selected(table) {
            return Err(SelectionError::UnknownTable(table.clone()));
        }

        let selection = match selection {
            ColumnSelection::All => ColumnSelection::All,
            ColumnSelection::Columns(columns) => {
                let mut unique: Vec<ColumnName> = Vec::with_capacity(columns.len());

                for column in columns {
                    let qualified = QualifiedColumn::new(table.clone(), column.clone());
                    self.require_column(schema, &qualified)?;

                    if !unique.contains(&column) {
                        unique.push(column);
                    }
                }

                ColumnSelection::Columns(unique)
            }
        };

        self.columns.insert(table.clone(), selection);

        Ok(())
    }

    /// Takes raw input, as all four fields come straight from the user.
    pub fn add_filter(
        &mut self,
        schema: &Database,
        table: &str,
        column: &str,
        operator: &str,
        value: &str,
    ) -> Result<()> {
        // Names are trimmed, the value is taken as typed.
        let names = [table, column, operator];
        if names.iter().any(|name| name.trim().is_empty()) || value.is_empty() {
            return Err(SelectionError::IncompleteFilter);
        }

        let column = QualifiedColumn::new(table.trim(), column.trim());
        self.require_column(schema, &column)?;

        let operator = operator
            .parse::<Operator>()
            .map_err(|_| SelectionError::UnknownOperator(operator.to_string()))?;

        self.filters.push(Filter {
            column,
            operator,
            value: value.to_string(),
        });

        Ok(())
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<Filter> {
        if index < self.filters.len() {
            Some(self.filters.remove(index))
        } else {
            None
        }
    }

    /// Returns false if the column was already grouped on.
    pub fn add_group_by(&mut self, schema: &Database, column: QualifiedColumn) -> Result<bool> {
        self.require_column(schema, &column)?;

        if self.group_by.contains(&column) {
            return Ok(false);
        }

        self.group_by.push(column);

        Ok(true)
    }

    /// Only exact duplicates are skipped: the same column can be ordered both ways.
    pub fn add_order_by(
        &mut self,
        schema: &Database,
        column: QualifiedColumn,
        direction: OrderDirection,
    ) -> Result<bool> {
        self.require_column(schema, &column)?;

        let order = OrderBy { column, direction };
        if self.order_by.contains(&order) {
            return Ok(false);
        }

        self.order_by.push(order);

        Ok(true)
    }

    pub fn set_aggregate(&mut self, aggregate: Aggregate) {
        self.aggregate = aggregate;
    }

    pub fn set_limit(&mut self, limit: &str) {
        let limit = limit.trim();

        self.limit = if limit.is_empty() {
            None
        } else {
            Some(limit.to_string())
        };
    }

    /// Resets filters, grouping and ordering. Tables and columns stay.
    pub fn clear_all(&mut self) {
        self.filters.clear();
        self.group_by.clear();
        self.order_by.clear();
    }

    /// Checks every reference against the schema. Useful for selections that were saved while
    /// the schema looked different.
    pub fn validate(&self, schema: &Database) -> Result<()> {
        for table in &self.tables {
            if schema.table(table).is_none() {
                return Err(SelectionError::UnknownTable(table.clone()));
            }
        }

        for (table, selection) in &self.columns {
            if !self.is_selected(table) {
                return Err(SelectionError::UnknownTable(table.clone()));
            }

            if let ColumnSelection::Columns(columns) = selection {
                for column in columns {
                    let qualified = QualifiedColumn::new(table.clone(), column.clone());
                    self.require_column(schema, &qualified)?;
                }
            }
        }

        let referenced = self
            .filters
            .iter()
            .map(|filter| &filter.column)
            .chain(self.group_by.iter())
            .chain(self.order_by.iter().map(|order| &order.column));

        for column in referenced {
            self.require_column(schema, column)?;
        }

        Ok(())
    }

    fn require_column(&self, schema: &Database, column: &QualifiedColumn) -> Result<()> {
        if !self.is_selected(&column.table) {
            return Err(SelectionError::UnknownTable(column.table.clone()));
        }

        let table = schema
            .table(&column.table)
            .ok_or_else(|| SelectionError::UnknownTable(column.table.clone()))?;

        if table.has_column(&column.column) {
            Ok(())
        } else {
            Err(SelectionError::UnknownColumn(column.clone()))
        }
    }
}
