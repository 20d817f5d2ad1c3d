//! Access grant repository.
//!
//! # Responsibility
//! - Read and mutate `users2work_packages` / `users2partners` rows.
//!
//! # Invariants
//! - A `(username, value)` pair exists at most once per grant table.
//! - Every statement stands alone; no call opens a transaction.

use crate::repo::{delete_error, ensure_connection_ready, write_error, RepoResult};
use rusqlite::{params, Connection};
use serde::Serialize;

/// Grant relation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Lead of a work package, addressed by its code.
    WorkPackage,
    /// Lead of a partner, addressed by its name.
    Partner,
}

impl GrantKind {
    fn table(self) -> &'static str {
        match self {
            Self::WorkPackage => "users2work_packages",
            Self::Partner => "users2partners",
        }
    }

    fn value_column(self) -> &'static str {
        match self {
            Self::WorkPackage => "work_package",
            Self::Partner => "partner",
        }
    }
}

/// Repository interface for access grants.
pub trait GrantRepository {
    /// Granted values for `username`, ordered by grant id.
    fn list_grants(&self, kind: GrantKind, username: &str) -> RepoResult<Vec<String>>;
    fn insert_grant(&self, kind: GrantKind, username: &str, value: &str) -> RepoResult<()>;
    /// Returns `Ok(false)` when no such grant existed.
    fn delete_grant(&self, kind: GrantKind, username: &str, value: &str) -> RepoResult<bool>;
}

/// SQLite-backed grant repository.
#[derive(Clone, Copy)]
pub struct SqliteGrantRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGrantRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users2work_packages", "users2partners"])?;
        Ok(Self { conn })
    }
}

impl GrantRepository for SqliteGrantRepository<'_> {
    fn list_grants(&self, kind: GrantKind, username: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM {table} WHERE username = ?1 ORDER BY id ASC;",
            column = kind.value_column(),
            table = kind.table(),
        ))?;
        let mut rows = stmt.query([username])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get(0)?);
        }
        Ok(values)
    }

    fn insert_grant(&self, kind: GrantKind, username: &str, value: &str) -> RepoResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {table} (username, {column}) VALUES (?1, ?2);",
                    column = kind.value_column(),
                    table = kind.table(),
                ),
                params![username, value],
            )
            .map_err(|err| write_error(kind.table(), err))?;
        Ok(())
    }

    fn delete_grant(&self, kind: GrantKind, username: &str, value: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "DELETE FROM {table} WHERE username = ?1 AND {column} = ?2;",
                    column = kind.value_column(),
                    table = kind.table(),
                ),
                params![username, value],
            )
            .map_err(|err| delete_error(kind.table(), err))?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{GrantKind, GrantRepository, SqliteGrantRepository};
    use crate::db::open_db_in_memory;
    use crate::repo::RepoError;

    #[test]
    fn duplicate_grant_is_rejected_and_delete_reports_presence() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteGrantRepository::try_new(&conn).unwrap();

        repo.insert_grant(GrantKind::WorkPackage, "wplead", "WP-C1")
            .unwrap();
        let err = repo
            .insert_grant(GrantKind::WorkPackage, "wplead", "WP-C1")
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::DuplicateKey {
                table: "users2work_packages"
            }
        ));

        assert_eq!(
            repo.list_grants(GrantKind::WorkPackage, "wplead").unwrap(),
            vec!["WP-C1".to_string()]
        );
        assert!(repo.list_grants(GrantKind::Partner, "wplead").unwrap().is_empty());

        assert!(repo
            .delete_grant(GrantKind::WorkPackage, "wplead", "WP-C1")
            .unwrap());
        assert!(!repo
            .delete_grant(GrantKind::WorkPackage, "wplead", "WP-C1")
            .unwrap());
    }
}
