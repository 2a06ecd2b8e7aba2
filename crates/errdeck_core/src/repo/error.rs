//! Shared repository error type.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
///
/// `Db` is the storage failure surfaced to callers as retryable. `Conflict`
/// only escapes the dedup engine if a re-read after a lost race also fails.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, including busy timeouts.
    Db(DbError),
    /// Target row does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Unique index rejected the write.
    Duplicate {
        table: &'static str,
        column: &'static str,
    },
    /// A concurrent writer created the same fingerprint first.
    Conflict(String),
    /// Write attempted to change a column that is fixed after creation.
    ImmutableField(&'static str),
    /// Write referenced a row that does not exist.
    InvalidReference(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate { table, column } => {
                write!(f, "duplicate value for `{table}.{column}`")
            }
            Self::Conflict(details) => write!(f, "concurrent write conflict: {details}"),
            Self::ImmutableField(column) => write!(f, "`{column}` cannot be changed"),
            Self::InvalidReference(details) => write!(f, "invalid reference: {details}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
