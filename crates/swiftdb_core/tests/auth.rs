mod common;

use common::{hasher, seed, user_ctx, LEAD_PASSWORD, LEAD_USERNAME};
use rusqlite::Connection;
use swiftdb_core::db::open_db_in_memory;
use swiftdb_core::{
    AuthService, RequestContext, ServiceError, Sha256PasswordHasher, SqliteUserRepository,
};

const ADMIN_SECRET: &str = "correct horse battery staple";

fn auth_service(conn: &Connection) -> AuthService<SqliteUserRepository<'_>, Sha256PasswordHasher> {
    AuthService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        hasher(),
        ADMIN_SECRET,
    )
    .unwrap()
}

#[test]
fn stored_account_logs_in_with_fresh_session() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let auth = auth_service(&conn);

    let mut first = RequestContext::anonymous();
    let session = auth.login(&mut first, LEAD_USERNAME, LEAD_PASSWORD).unwrap();
    assert_eq!(session.username, LEAD_USERNAME);
    assert_eq!(first.identity().unwrap().username(), LEAD_USERNAME);
    assert!(!first.identity().unwrap().is_admin());

    let mut second = RequestContext::anonymous();
    let other = auth.login(&mut second, LEAD_USERNAME, LEAD_PASSWORD).unwrap();
    assert_ne!(session.id, other.id);
}

#[test]
fn account_migrated_with_sha256_crypt_hash_logs_in() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO users (username, password) VALUES ('legacy', ?1);",
        ["$5$rounds=5000$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZF7qIw3XG5"],
    )
    .unwrap();
    let auth = auth_service(&conn);

    let mut ctx = RequestContext::anonymous();
    let err = auth.login(&mut ctx, "legacy", "Hello world").unwrap_err();
    assert!(matches!(err, ServiceError::BadCredential));
    auth.login(&mut ctx, "legacy", "Hello world!").unwrap();
    assert_eq!(ctx.identity().unwrap().username(), "legacy");
}

#[test]
fn admin_secret_is_verified_like_any_other_hash() {
    let conn = open_db_in_memory().unwrap();
    let auth = auth_service(&conn);

    let mut ctx = RequestContext::anonymous();
    let err = auth.login(&mut ctx, "admin", "guess").unwrap_err();
    assert!(matches!(err, ServiceError::BadCredential));
    assert!(ctx.identity().is_none());

    auth.login(&mut ctx, "admin", ADMIN_SECRET).unwrap();
    assert!(ctx.require_admin().is_ok());
}

#[test]
fn login_failures_are_distinguished() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let auth = auth_service(&conn);
    let mut ctx = RequestContext::anonymous();

    let err = auth.login(&mut ctx, "ghost", LEAD_PASSWORD).unwrap_err();
    assert!(matches!(err, ServiceError::UnknownUser(ref name) if name == "ghost"));
    assert_eq!(err.user_message(), "Username not found");

    let err = auth.login(&mut ctx, LEAD_USERNAME, "WrongPassw0rd").unwrap_err();
    assert!(matches!(err, ServiceError::BadCredential));
    assert_eq!(err.user_message(), "Incorrect password");

    auth.login(&mut ctx, LEAD_USERNAME, LEAD_PASSWORD).unwrap();
    let err = auth.login(&mut ctx, LEAD_USERNAME, LEAD_PASSWORD).unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyLoggedIn));
}

#[test]
fn logout_requires_and_clears_identity() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let auth = auth_service(&conn);

    let mut ctx = RequestContext::anonymous();
    assert!(matches!(
        auth.logout(&mut ctx).unwrap_err(),
        ServiceError::Unauthenticated
    ));

    auth.login(&mut ctx, LEAD_USERNAME, LEAD_PASSWORD).unwrap();
    auth.logout(&mut ctx).unwrap();
    assert!(ctx.identity().is_none());
}

#[test]
fn change_password_reverifies_current_and_checks_policy() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let auth = auth_service(&conn);
    let mut ctx = user_ctx(LEAD_USERNAME);

    let err = auth
        .change_password(&mut ctx, LEAD_PASSWORD, "short", "short")
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => assert!(errors.message_for("new").is_some()),
        other => panic!("unexpected error: {other}"),
    }

    let err = auth
        .change_password(&mut ctx, LEAD_PASSWORD, "NewPassw0rd", "NewPassw0rX")
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => assert!(errors.message_for("confirm").is_some()),
        other => panic!("unexpected error: {other}"),
    }

    let err = auth
        .change_password(&mut ctx, "NotMyPassw0rd", "NewPassw0rd", "NewPassw0rd")
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadCredential));

    auth.change_password(&mut ctx, LEAD_PASSWORD, "NewPassw0rd", "NewPassw0rd")
        .unwrap();

    let mut fresh = RequestContext::anonymous();
    assert!(matches!(
        auth.login(&mut fresh, LEAD_USERNAME, LEAD_PASSWORD).unwrap_err(),
        ServiceError::BadCredential
    ));
    auth.login(&mut fresh, LEAD_USERNAME, "NewPassw0rd").unwrap();
}

#[test]
fn admin_password_is_not_changed_here() {
    let conn = open_db_in_memory().unwrap();
    let auth = auth_service(&conn);
    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, "admin", ADMIN_SECRET).unwrap();

    let err = auth
        .change_password(&mut ctx, ADMIN_SECRET, "NewPassw0rd", "NewPassw0rd")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
}
