//! Account repository.
//!
//! The password column is only ever read into [`StoredCredential`] and only
//! ever written with an already-hashed value.

use crate::model::record::{RecordId, User};
use crate::repo::{ensure_connection_ready, write_error, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::{Debug, Formatter};

/// Account row together with its stored password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub user: User,
    pub password_hash: String,
}

impl Debug for StoredCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("user", &self.user)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Repository interface for login accounts.
pub trait UserRepository {
    fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<RecordId>;
    fn get_user(&self, id: RecordId) -> RepoResult<Option<User>>;
    fn find_credential(&self, username: &str) -> RepoResult<Option<StoredCredential>>;
    /// Returns `Ok(false)` when `username` has no account.
    fn set_password_hash(&self, username: &str, password_hash: &str) -> RepoResult<bool>;
}

/// SQLite-backed account repository.
#[derive(Clone, Copy)]
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<RecordId> {
        self.conn
            .execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2);",
                params![username, password_hash],
            )
            .map_err(|err| write_error("users", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_user(&self, id: RecordId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username FROM users WHERE id = ?1;",
                [id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn find_credential(&self, username: &str) -> RepoResult<Option<StoredCredential>> {
        let credential = self
            .conn
            .query_row(
                "SELECT id, username, password FROM users WHERE username = ?1;",
                [username],
                |row| {
                    Ok(StoredCredential {
                        user: User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                        },
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    fn set_password_hash(&self, username: &str, password_hash: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET password = ?2 WHERE username = ?1;",
            params![username, password_hash],
        )?;
        Ok(changed > 0)
    }
}
