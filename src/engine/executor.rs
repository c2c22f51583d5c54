use crate::engine::sql::querying::sqlite;
use crate::engine::sql::structure::StoreParams;
use crate::engine::CompiledQuery;
use log::{debug, info, warn};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column as _, Connection as _, Executor, Row, Statement, TypeInfo, ValueRef};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A single value out of a result row, in whatever storage class SQLite had for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Everything a query run produced. Failures are reported through `error`, with empty columns
/// and rows, so the caller can keep editing and try again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub error: Option<ExecutionError>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

/// Runs the query on a fresh connection, inside a transaction, and closes the connection after.
///
/// Never fails: errors end up in [`ResultSet::error`].
pub async fn execute(query: &CompiledQuery, store: &StoreParams) -> ResultSet {
    match try_execute(query, store).await {
        Ok(results) => {
            info!("query returned {} rows", results.rows.len());

            results
        }
        Err(error) => {
            warn!("query failed: {error}");

            ResultSet {
                error: Some(error),
                ..ResultSet::default()
            }
        }
    }
}

async fn try_execute(query: &CompiledQuery, store: &StoreParams) -> Result<ResultSet, ExecutionError> {
    debug!("executing {} with {:?}", query.sql(), query.params());

    let mut connection = sqlite(store).await?;

    let statement = connection.as_inner().prepare(query.sql()).await?;
    let columns: Vec<String> = statement
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let mut bound = sqlx::query(query.sql());
    for param in query.params() {
        bound = bound.bind(param.as_str());
    }

    let mut transaction = connection.as_inner().begin().await?;

    let rows = if columns.is_empty() {
        // Nothing to display, but the statement still has to run.
        bound.execute(&mut *transaction).await?;

        Vec::new()
    } else {
        let rows = bound.fetch_all(&mut *transaction).await?;

        rows.iter()
            .map(|row| {
                (0..columns.len())
                    .map(|index| Cell::decode(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    transaction.commit().await?;
    connection.close().await?;

    Ok(ResultSet {
        columns,
        rows,
        error: None,
    })
}

impl Cell {
    pub fn decode(row: &SqliteRow, index: usize) -> Result<Cell, sqlx::Error> {
        let raw = row.try_get_raw(index)?;

        if raw.is_null() {
            return Ok(Cell::Null);
        }

        // SQLite types values, not columns, so we go by what is actually stored.
        let storage_class = raw.type_info().name().to_string();

        let cell = match storage_class.as_str() {
            "INTEGER" | "BOOLEAN" => Cell::Integer(row.try_get_unchecked(index)?),
            "REAL" | "NUMERIC" => Cell::Real(row.try_get_unchecked(index)?),
            "BLOB" => Cell::Blob(row.try_get_unchecked(index)?),
            _ => Cell::Text(row.try_get_unchecked(index)?),
        };

        Ok(cell)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl ResultSet {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Integer(value) => write!(f, "{value}"),
            Cell::Real(value) => write!(f, "{value}"),
            Cell::Text(value) => write!(f, "{value}"),
            Cell::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<sqlx::Error> for ExecutionError {
    fn from(error: sqlx::Error) -> Self {
        let message = match &error {
            sqlx::Error::Database(database_error) => database_error.message().to_string(),
            other => other.to_string(),
        };

        ExecutionError { message }
    }
}

impl From<crate::Error> for ExecutionError {
    fn from(error: crate::Error) -> Self {
        match error.into_inner() {
            crate::ErrorKind::SqlError(sql_error) => sql_error.into(),
            other => ExecutionError {
                message: other.to_string(),
            },
        }
    }
}
