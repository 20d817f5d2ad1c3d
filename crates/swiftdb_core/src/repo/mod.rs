//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep SQL details inside the persistence boundary.
//! - Translate store constraint failures into semantic errors.
//!
//! # Invariants
//! - Repositories are only built over migrated connections (`try_new`).
//! - A uniqueness violation surfaces as `DuplicateKey`, a blocked delete as
//!   `ReferentialConflict`; every other store failure stays `Db`.

use crate::db::migrations::latest_version;
use crate::db::{constraint_kind, ConstraintKind, DbError};
use crate::model::record::RecordId;
use crate::model::table::TableKind;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod grant_repo;
pub mod record_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error shared by all repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// No row with this id in the table.
    NotFound { kind: TableKind, id: RecordId },
    /// A unique natural key already exists.
    DuplicateKey { table: &'static str },
    /// Other rows still reference the row being deleted.
    ReferentialConflict { table: &'static str },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Operation is not supported for this kind of row.
    Unsupported(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} row not found: {id}"),
            Self::DuplicateKey { table } => {
                write!(f, "unique constraint violated in table `{table}`")
            }
            Self::ReferentialConflict { table } => {
                write!(f, "row in table `{table}` is referenced by other rows")
            }
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
            Self::Unsupported(message) => write!(f, "unsupported operation: {message}"),
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

/// Classifies a failed insert/update statement against `table`.
pub(crate) fn write_error(table: &'static str, err: rusqlite::Error) -> RepoError {
    match constraint_kind(&err) {
        Some(ConstraintKind::Unique) => RepoError::DuplicateKey { table },
        _ => RepoError::from(err),
    }
}

/// Classifies a failed delete statement against `table`.
pub(crate) fn delete_error(table: &'static str, err: rusqlite::Error) -> RepoError {
    match constraint_kind(&err) {
        Some(ConstraintKind::Reference) => RepoError::ReferentialConflict { table },
        _ => RepoError::from(err),
    }
}

/// Checks schema version and required tables before a repository is handed out.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required_tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in required_tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [*table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(*table));
        }
    }

    Ok(())
}
