//! Core record-keeping logic for SWIFT DB.
//! This crate is the single source of truth for record, access and credential invariants.

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::password::{PasswordError, PasswordHasher, Sha256PasswordHasher};
pub use config::{AppConfig, ConfigError};
pub use context::{Flash, FlashLevel, Identity, RequestContext, Session, ADMIN_USERNAME};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::record::{
    Deliverable, DeliverableInput, Partner, PartnerInput, Record, RecordId, RecordInput, Task,
    TaskDeliverableLink, TaskDeliverableLinkInput, TaskInput, User, UserInput, WorkPackage,
    WorkPackageInput, END_MONTH, MAX_PERCENT,
};
pub use model::table::{ChoiceSource, FieldSpec, FieldWidget, FormData, TableKind};
pub use model::validation::{FieldError, ValidationErrors};
pub use repo::grant_repo::{GrantKind, GrantRepository, SqliteGrantRepository};
pub use repo::record_repo::{RecordRepository, SqliteRecordRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::access_service::{AccessService, GrantReconciliation, UserGrants};
pub use service::auth_service::AuthService;
pub use service::cross_ref::CrossRefResolver;
pub use service::lead_service::{LeadService, PartnerSummary, WorkPackageSummary};
pub use service::record_service::RecordService;
pub use service::{resolve_table_kind, Missing, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
