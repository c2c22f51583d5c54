use crate::engine::{ExecutionError, QueryBuildError, SelectionError};
use std::env::VarError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(value: E) -> Self {
        Error(Box::new(value.into()))
    }
}

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// Errors originating from the SQLite driver
    #[error("Error trying to query database:\n{0}")]
    SqlError(#[from] sqlx::Error),
    #[error("Invalid selection:\n{0}")]
    SelectionError(#[from] SelectionError),
    #[error("Cannot build query:\n{0}")]
    QueryBuildError(#[from] QueryBuildError),
    #[error("Query failed:\n{0}")]
    ExecutionError(#[from] ExecutionError),
    #[error("Internal error:\n{0}")]
    InternalError(#[from] InternalError),
    #[error("Could not find environment variable: \n{0}")]
    EnvVarError(#[from] VarError),
    #[error("IO error:\n{0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error:\n{0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error:\n{0}")]
    CsvError(#[from] csv::Error),
    #[error("Error reading data from stdin")]
    DialogueError(#[from] dialoguer::Error),
}

#[derive(Error, Debug)]
pub struct InternalError(pub String);

impl Display for InternalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn into_inner(self) -> ErrorKind {
        *self.0
    }
}
