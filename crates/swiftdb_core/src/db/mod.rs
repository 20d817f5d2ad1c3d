//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the record store.
//! - Apply schema migrations in deterministic order.
//! - Classify constraint failures raised by the store.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No record data is read or written before migrations succeed.

use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Store-level meaning of a failed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// A `UNIQUE` or primary key constraint rejected the write.
    Unique,
    /// A reference guard or foreign key rejected the write.
    Reference,
    /// A `CHECK` constraint rejected the write.
    Check,
}

/// Maps a SQLite failure onto a [`ConstraintKind`] using extended result codes.
///
/// Returns `None` for anything that is not a constraint violation, so callers
/// never mistake an I/O or locking failure for a data conflict.
pub fn constraint_kind(err: &rusqlite::Error) -> Option<ConstraintKind> {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    if failure.code != rusqlite::ErrorCode::ConstraintViolation {
        return None;
    }
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Some(ConstraintKind::Unique)
        }
        ffi::SQLITE_CONSTRAINT_TRIGGER | ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
            Some(ConstraintKind::Reference)
        }
        ffi::SQLITE_CONSTRAINT_CHECK => Some(ConstraintKind::Check),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{constraint_kind, ConstraintKind};
    use rusqlite::Connection;

    fn guarded_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE rows (key TEXT UNIQUE, amount INTEGER CHECK (amount >= 0));
             CREATE TRIGGER rows_guard BEFORE DELETE ON rows
             BEGIN
                 SELECT RAISE(ABORT, 'row is referenced');
             END;
             INSERT INTO rows (key, amount) VALUES ('a', 1);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn extended_codes_map_to_constraint_kinds() {
        let conn = guarded_table();

        let err = conn
            .execute("INSERT INTO rows (key, amount) VALUES ('a', 2);", [])
            .unwrap_err();
        assert_eq!(constraint_kind(&err), Some(ConstraintKind::Unique));

        let err = conn
            .execute("INSERT INTO rows (key, amount) VALUES ('b', -1);", [])
            .unwrap_err();
        assert_eq!(constraint_kind(&err), Some(ConstraintKind::Check));

        let err = conn.execute("DELETE FROM rows;", []).unwrap_err();
        assert_eq!(constraint_kind(&err), Some(ConstraintKind::Reference));
    }

    #[test]
    fn non_constraint_failures_are_unclassified() {
        let conn = guarded_table();
        conn.execute_batch("PRAGMA query_only = ON;").unwrap();

        let err = conn
            .execute("INSERT INTO rows (key, amount) VALUES ('b', 1);", [])
            .unwrap_err();
        assert_eq!(constraint_kind(&err), None);
        assert_eq!(constraint_kind(&rusqlite::Error::QueryReturnedNoRows), None);
    }
}
