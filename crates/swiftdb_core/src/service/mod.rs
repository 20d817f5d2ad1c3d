//! Use-case services.
//!
//! # Responsibility
//! - Enforce authorization and validation above the repository layer.
//! - Expose one error taxonomy (`ServiceError`) to request boundaries.
//!
//! # Invariants
//! - Every mutating operation checks the caller's `RequestContext` first.
//! - Services never hold a connection; they borrow repositories.

use crate::auth::password::PasswordError;
use crate::model::record::RecordId;
use crate::model::table::TableKind;
use crate::model::validation::ValidationErrors;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod access_service;
pub mod auth_service;
pub mod cross_ref;
pub mod lead_service;
pub mod record_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// What could not be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    /// Table name outside the allow-list.
    Table(String),
    /// No row with this id.
    Record { kind: TableKind, id: RecordId },
}

/// Error taxonomy surfaced to request boundaries.
#[derive(Debug)]
pub enum ServiceError {
    /// Field-level input failures.
    Validation(ValidationErrors),
    /// A unique natural key already exists; nothing was written.
    DuplicateKey { table: &'static str },
    /// Other rows reference the target of a delete; nothing was removed.
    ReferentialConflict { table: &'static str },
    NotFound(Missing),
    /// Logged in, but without a grant for the target.
    Forbidden,
    /// No logged-in identity.
    Unauthenticated,
    UnknownUser(String),
    BadCredential,
    AlreadyLoggedIn,
    /// A password could not be hashed; nothing was written.
    Credential(PasswordError),
    /// Any other store failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => format!("Please correct the form: {errors}"),
            Self::DuplicateKey { .. } => {
                "Integrity Error: Violation of unique constraint(s)".to_string()
            }
            Self::ReferentialConflict { .. } => {
                "Integrity Error: Cannot delete, other database entries reference this one"
                    .to_string()
            }
            Self::NotFound(_) => "Not found".to_string(),
            Self::Forbidden => "Unauthorised, you do not have access to this entry".to_string(),
            Self::Unauthenticated => "Unauthorised, please login".to_string(),
            Self::UnknownUser(_) => "Username not found".to_string(),
            Self::BadCredential => "Incorrect password".to_string(),
            Self::AlreadyLoggedIn => "Already logged in".to_string(),
            Self::Credential(_) => "Password could not be stored, please try again later".to_string(),
            Self::Repo(_) => "Database error, please try again later".to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "validation failed: {errors}"),
            Self::DuplicateKey { table } => write!(f, "duplicate key in table `{table}`"),
            Self::ReferentialConflict { table } => {
                write!(f, "row in table `{table}` is still referenced")
            }
            Self::NotFound(Missing::Table(name)) => write!(f, "unknown table kind `{name}`"),
            Self::NotFound(Missing::Record { kind, id }) => {
                write!(f, "{kind} row not found: {id}")
            }
            Self::Forbidden => write!(f, "forbidden"),
            Self::Unauthenticated => write!(f, "not logged in"),
            Self::UnknownUser(username) => write!(f, "unknown user `{username}`"),
            Self::BadCredential => write!(f, "bad credential"),
            Self::AlreadyLoggedIn => write!(f, "already logged in"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Credential(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound(Missing::Record { kind, id }),
            RepoError::DuplicateKey { table } => Self::DuplicateKey { table },
            RepoError::ReferentialConflict { table } => Self::ReferentialConflict { table },
            other => Self::Repo(other),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(value: PasswordError) -> Self {
        Self::Credential(value)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Resolves an external table name, failing with `NotFound` outside the allow-list.
pub fn resolve_table_kind(name: &str) -> ServiceResult<TableKind> {
    TableKind::parse(name).ok_or_else(|| ServiceError::NotFound(Missing::Table(name.to_string())))
}
