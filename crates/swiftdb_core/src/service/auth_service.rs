//! Login, logout and password changes.
//!
//! # Responsibility
//! - Verify credentials for stored accounts and the reserved admin identity.
//! - Move a `RequestContext` between anonymous and authenticated.
//!
//! # Invariants
//! - The admin secret is hashed once at construction and verified like any
//!   stored account hash.
//! - Plaintext passwords are never logged or persisted.

use crate::auth::password::PasswordHasher;
use crate::context::{FlashLevel, RequestContext, Session, ADMIN_USERNAME};
use crate::model::record::validate_password;
use crate::repo::user_repo::UserRepository;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

pub struct AuthService<U: UserRepository, H: PasswordHasher> {
    users: U,
    hasher: H,
    admin_hash: String,
}

impl<U: UserRepository, H: PasswordHasher> AuthService<U, H> {
    /// Creates the service, hashing the configured admin secret.
    pub fn new(users: U, hasher: H, admin_password: &str) -> ServiceResult<Self> {
        let admin_hash = hasher.hash(admin_password)?;
        Ok(Self {
            users,
            hasher,
            admin_hash,
        })
    }

    /// Authenticates `username` and attaches the identity to `ctx`.
    ///
    /// # Errors
    /// - `AlreadyLoggedIn` when `ctx` already carries an identity.
    /// - `UnknownUser` when no account matches.
    /// - `BadCredential` when the password does not verify.
    pub fn login(
        &self,
        ctx: &mut RequestContext,
        username: &str,
        password: &str,
    ) -> ServiceResult<Session> {
        if ctx.identity().is_some() {
            return Err(ServiceError::AlreadyLoggedIn);
        }

        let verified = if username == ADMIN_USERNAME {
            self.hasher.verify(password, &self.admin_hash)
        } else {
            let credential = self
                .users
                .find_credential(username)?
                .ok_or_else(|| ServiceError::UnknownUser(username.to_string()))?;
            self.hasher.verify(password, &credential.password_hash)
        };
        if !verified {
            warn!("event=login module=auth status=error reason=bad_credential");
            return Err(ServiceError::BadCredential);
        }

        ctx.sign_in(username);
        let session = Session::new(username);
        info!(
            "event=login module=auth status=ok session_id={}",
            session.id
        );
        ctx.flash(FlashLevel::Success, "You are now logged in");
        Ok(session)
    }

    /// Clears the identity from `ctx`.
    pub fn logout(&self, ctx: &mut RequestContext) -> ServiceResult<()> {
        ctx.require_login()?;
        ctx.sign_out();
        info!("event=logout module=auth status=ok");
        ctx.flash(FlashLevel::Success, "You are now logged out");
        Ok(())
    }

    /// Replaces the caller's password after re-verifying the current one.
    ///
    /// The admin secret is configuration-managed and cannot be changed here.
    pub fn change_password(
        &self,
        ctx: &mut RequestContext,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> ServiceResult<()> {
        let identity = ctx.require_login()?;
        if identity.is_admin() {
            return Err(ServiceError::Forbidden);
        }
        let username = identity.username().to_string();

        let mut errors = validate_password("new", new);
        if new != confirm {
            errors.push("confirm", "Passwords do not match");
        }
        errors.into_result()?;

        let credential = self
            .users
            .find_credential(&username)?
            .ok_or_else(|| ServiceError::UnknownUser(username.clone()))?;
        if !self.hasher.verify(current, &credential.password_hash) {
            warn!("event=password_change module=auth status=error reason=bad_credential");
            return Err(ServiceError::BadCredential);
        }

        let password_hash = self.hasher.hash(new)?;
        if !self.users.set_password_hash(&username, &password_hash)? {
            return Err(ServiceError::UnknownUser(username));
        }

        info!("event=password_change module=auth status=ok");
        ctx.flash(FlashLevel::Success, "Password changed");
        Ok(())
    }
}
