//! Per-request caller state.
//!
//! # Responsibility
//! - Carry the authenticated identity into every service call.
//! - Collect user-facing flash messages produced while serving a request.
//!
//! # Invariants
//! - A context is owned by exactly one request; nothing here is global.
//! - `is_admin` is true only for the reserved admin username.

use crate::service::ServiceError;
use serde::Serialize;
use uuid::Uuid;

/// Reserved username with unconditional access to every record.
pub const ADMIN_USERNAME: &str = "admin";

/// Established login, handed back to the transport to persist client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub username: String,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
        }
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_admin(&self) -> bool {
        self.username == ADMIN_USERNAME
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Identity plus pending flash messages for one request.
#[derive(Debug, Default)]
pub struct RequestContext {
    identity: Option<Identity>,
    flashes: Vec<Flash>,
}

impl RequestContext {
    /// Context for a caller that has not logged in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context restored from an existing session.
    pub fn for_session(session: &Session) -> Self {
        Self {
            identity: Some(Identity::new(session.username.clone())),
            flashes: Vec::new(),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub(crate) fn sign_in(&mut self, username: &str) {
        self.identity = Some(Identity::new(username));
    }

    pub(crate) fn sign_out(&mut self) {
        self.identity = None;
    }

    /// Fails with `Unauthenticated` unless someone is logged in.
    pub fn require_login(&self) -> Result<&Identity, ServiceError> {
        self.identity.as_ref().ok_or(ServiceError::Unauthenticated)
    }

    /// Fails unless the admin identity is logged in.
    pub fn require_admin(&self) -> Result<&Identity, ServiceError> {
        let identity = self.require_login()?;
        if identity.is_admin() {
            Ok(identity)
        } else {
            Err(ServiceError::Forbidden)
        }
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flashes.push(Flash {
            level,
            message: message.into(),
        });
    }

    /// Returns and clears pending messages.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }

    /// Converts a failed operation into a danger flash.
    ///
    /// Returns the success value, or `None` after recording the error message.
    pub fn recover<T>(&mut self, result: Result<T, ServiceError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.flash(FlashLevel::Danger, err.user_message());
                None
            }
        }
    }
}
