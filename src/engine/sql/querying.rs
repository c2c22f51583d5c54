use crate::engine::executor::Cell;
use crate::engine::sql::structure::{
    Column, ColumnName, Database, ForeignKey, Key, KeyReference, StoreParams, Table, TableName,
};
use crate::{Error, InternalError};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection as _};
use std::collections::BTreeMap;

/// How many distinct values we offer as suggestions when the user is typing in a filter.
pub const SAMPLE_VALUES_LIMIT: i64 = 50;

#[async_trait]
pub trait Analyzer: Send {
    async fn schema_version(&mut self) -> Result<i64, Error>;

    async fn list_tables(&mut self) -> Result<Vec<TableName>, Error>;

    async fn table_columns(&mut self, table: &TableName) -> Result<Vec<Column>, Error>;

    /// Foreign keys as declared. Keys that reference the parent's primary key implicitly come back
    /// with an empty `to` key; [`analyze`] fills those in.
    async fn table_foreign_keys(&mut self, table: &TableName) -> Result<Vec<ForeignKey>, Error>;

    async fn sample_values(
        &mut self,
        table: &TableName,
        column: &ColumnName,
    ) -> Result<Vec<String>, Error>;
}

/// A single connection to the store. Dropping it closes the connection, but [`Connection::close`]
/// does it gracefully.
pub struct Connection {
    inner: SqliteConnection,
}

pub async fn sqlite(params: &StoreParams) -> Result<Connection, Error> {
    debug!("opening {params}");

    let inner = SqliteConnectOptions::new()
        .filename(&params.path)
        .foreign_keys(params.foreign_keys)
        .connect()
        .await?;

    Ok(Connection { inner })
}

impl Connection {
    pub fn as_inner(&mut self) -> &mut SqliteConnection {
        &mut self.inner
    }

    pub async fn close(self) -> Result<(), Error> {
        self.inner.close().await?;

        Ok(())
    }
}

#[async_trait]
impl Analyzer for Connection {
    async fn schema_version(&mut self) -> Result<i64, Error> {
        let (version,): (i64,) = sqlx::query_as("PRAGMA schema_version")
            .fetch_one(&mut self.inner)
            .await?;

        Ok(version)
    }

    async fn list_tables(&mut self) -> Result<Vec<TableName>, Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name\n\
             FROM sqlite_master\n\
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'\n\
             ORDER BY name",
        )
        .fetch_all(&mut self.inner)
        .await?;

        Ok(rows.into_iter().map(|row| TableName::new(row.0)).collect())
    }

    async fn table_columns(&mut self, table: &TableName) -> Result<Vec<Column>, Error> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT name, type, pk\n\
             FROM pragma_table_info(?)\n\
             ORDER BY cid",
        )
        .bind(table.as_str())
        .fetch_all(&mut self.inner)
        .await?;

        let columns = rows
            .into_iter()
            .map(|(name, declared_type, pk)| Column {
                name: ColumnName(name),
                declared_type,
                is_primary_key: pk > 0,
            })
            .collect();

        Ok(columns)
    }

    async fn table_foreign_keys(&mut self, table: &TableName) -> Result<Vec<ForeignKey>, Error> {
        let rows: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, \"table\", \"from\", \"to\"\n\
             FROM pragma_foreign_key_list(?)\n\
             ORDER BY id, seq",
        )
        .bind(table.as_str())
        .fetch_all(&mut self.inner)
        .await?;

        // Composite keys come back as one row per column, all sharing the same id.
        let mut foreign_keys: BTreeMap<i64, ForeignKey> = BTreeMap::new();

        for (id, referenced_table, from_column, to_column) in rows {
            let fk = foreign_keys.entry(id).or_insert_with(|| ForeignKey {
                from: KeyReference {
                    table: table.clone(),
                    key: Key::default(),
                },
                to: KeyReference {
                    table: TableName::new(referenced_table),
                    key: Key::default(),
                },
            });

            fk.from.key.columns.push(ColumnName(from_column));
            if let Some(to_column) = to_column {
                fk.to.key.columns.push(ColumnName(to_column));
            }
        }

        Ok(foreign_keys.into_values().collect())
    }

    async fn sample_values(
        &mut self,
        table: &TableName,
        column: &ColumnName,
    ) -> Result<Vec<String>, Error> {
        // SQLite reads a quoted name that matches no column as a string literal.
        let columns = self.table_columns(table).await?;
        if !columns.iter().any(|known| &known.name == column) {
            return Err(InternalError(format!("{table} has no column {column}")).into());
        }

        let table = quote_identifier(table.as_str())?;
        let column = quote_identifier(column.as_str())?;

        let rows = sqlx::query(&format!(
            "SELECT DISTINCT {column} FROM {table} WHERE {column} IS NOT NULL LIMIT ?"
        ))
        .bind(SAMPLE_VALUES_LIMIT)
        .fetch_all(&mut self.inner)
        .await?;

        rows.iter()
            .map(|row| Ok(Cell::decode(row, 0)?.to_string()))
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::from)
    }
}

/// Reads the whole schema into a snapshot.
pub async fn analyze(connection: &mut dyn Analyzer) -> Result<Database, Error> {
    let schema_version = connection.schema_version().await?;
    let table_names = connection.list_tables().await?;

    let mut tables = Vec::with_capacity(table_names.len());
    for table_name in table_names {
        let columns = connection.table_columns(&table_name).await?;
        let foreign_keys = connection.table_foreign_keys(&table_name).await?;

        let primary_key = Key {
            columns: columns
                .iter()
                .filter(|column| column.is_primary_key)
                .map(|column| column.name.clone())
                .collect(),
        };

        tables.push(Table {
            name: table_name,
            primary_key,
            columns,
            foreign_keys,
        });
    }

    let mut database = Database::from_tables(schema_version, tables);
    resolve_implicit_references(&mut database);

    debug!(
        "analyzed {} tables at schema version {}",
        database.tables.len(),
        schema_version
    );

    Ok(database)
}

/// `REFERENCES crops` without a column list points at the primary key of `crops`.
fn resolve_implicit_references(database: &mut Database) {
    let primary_keys: BTreeMap<TableName, Key> = database
        .tables
        .iter()
        .map(|(name, table)| (name.clone(), table.primary_key.clone()))
        .collect();

    for table in database.tables.values_mut() {
        for fk in table.foreign_keys.iter_mut() {
            if !fk.to.key.columns.is_empty() {
                continue;
            }

            match primary_keys.get(&fk.to.table) {
                Some(primary_key) => fk.to.key = primary_key.clone(),
                None => warn!(
                    "{} references missing table {}",
                    fk.from.table, fk.to.table
                ),
            }
        }
    }
}

/// Names get spliced into the few statements that cannot bind them as parameters. We only ever
/// splice names we read from the schema, but still refuse anything that isn't a plain identifier.
fn quote_identifier(name: &str) -> Result<String, Error> {
    static IDENTIFIER_REGEX: Lazy<Regex> =
        Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

    if IDENTIFIER_REGEX.is_match(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(InternalError(format!("Refusing to query unusual identifier \"{name}\"")).into())
    }
}
