//! Structures used to represent the structure of the database. The query builder reads these to
//! validate selections and to figure out how tables join.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Parameters used to reach the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreParams {
    /// Location of the SQLite file.
    pub path: PathBuf,
    /// SQLite enforces foreign keys per connection, so this is applied on every connect.
    #[serde(default = "enforce_foreign_keys")]
    pub foreign_keys: bool,
}

/// A snapshot of the schema, as seen at a given `schema_version`.
///
/// SQLite bumps the schema version on every DDL statement, so comparing versions is enough to
/// know if a snapshot went stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    pub schema_version: i64,
    pub tables: BTreeMap<TableName, Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: ColumnName,
    /// Whatever was written in the CREATE TABLE statement, possibly empty.
    pub declared_type: String,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: TableName,
    pub primary_key: Key,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub columns: Vec<ColumnName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub from: KeyReference,
    pub to: KeyReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReference {
    pub table: TableName,
    pub key: Key,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd, Hash)]
pub struct ColumnName(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Ord, PartialOrd, Hash)]
pub struct TableName(String);

fn enforce_foreign_keys() -> bool {
    true
}

impl StoreParams {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        StoreParams {
            path: path.into(),
            foreign_keys: true,
        }
    }
}

impl Database {
    pub fn table(&self, name: &TableName) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &TableName> {
        self.tables.keys()
    }

    /// Builds a snapshot out of already analyzed tables.
    pub fn from_tables<I>(schema_version: i64, tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        Database {
            schema_version,
            tables: tables
                .into_iter()
                .map(|table| (table.name.clone(), table))
                .collect(),
        }
    }
}

impl TableName {
    pub fn new(name: String) -> Self {
        TableName(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Table {
    pub fn column(&self, name: &ColumnName) -> Option<&Column> {
        self.columns.iter().find(|column| &column.name == name)
    }

    pub fn has_column(&self, name: &ColumnName) -> bool {
        self.column(name).is_some()
    }

    pub fn get_foreign_key(&self, to_table: &TableName) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|foreign_key| &foreign_key.to.table == to_table)
    }
}

impl ForeignKey {
    pub fn key_pairs(&self) -> Vec<(&ColumnName, &ColumnName)> {
        self.from
            .key
            .columns
            .iter()
            .zip(&self.to.key.columns)
            .collect()
    }

    pub fn invert(&self) -> ForeignKey {
        ForeignKey {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl ColumnName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<&str> for ColumnName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for TableName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for ColumnName {
    fn from(name: T) -> ColumnName {
        ColumnName(name.into())
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl<T: Into<String>> From<T> for TableName {
    fn from(name: T) -> TableName {
        TableName::new(name.into())
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl<T: Into<String>> From<T> for Column {
    fn from(name: T) -> Column {
        Column {
            name: name.into().into(),
            declared_type: String::new(),
            is_primary_key: false,
        }
    }
}

impl From<&[&str]> for Key {
    fn from(columns: &[&str]) -> Self {
        Key {
            columns: columns.iter().map(|&column| column.into()).collect(),
        }
    }
}

impl Display for StoreParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
