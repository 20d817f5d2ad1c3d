//! SHA-256 crypt password hashing.
//!
//! Encoded form: `$5$rounds=<n>$<salt>$<digest>`, readable by passlib's
//! `sha256_crypt` and glibc `crypt(3)`.

use sha_crypt::{sha256_check, sha256_simple, Sha256Params};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default work factor for new hashes, matching passlib's `sha256_crypt`.
pub const DEFAULT_ROUNDS: usize = 535_000;
const MIN_ROUNDS: usize = 1_000;
const MAX_ROUNDS: usize = 999_999_999;

/// A password could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordError(String);

impl Display for PasswordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "password hashing failed: {}", self.0)
    }
}

impl Error for PasswordError {}

/// One-way password hashing seam.
pub trait PasswordHasher {
    /// Produces a self-describing salted hash of `password`.
    fn hash(&self, password: &str) -> Result<String, PasswordError>;
    /// Returns whether `password` matches `encoded`. Malformed input is a mismatch.
    fn verify(&self, password: &str, encoded: &str) -> bool;
}

/// `sha256_crypt` with a random per-password salt.
#[derive(Debug, Clone, Copy)]
pub struct Sha256PasswordHasher {
    rounds: usize,
}

impl Default for Sha256PasswordHasher {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl Sha256PasswordHasher {
    /// Uses `rounds` iterations for new hashes, clamped to `1000..=999_999_999`.
    pub fn with_rounds(rounds: usize) -> Self {
        Self {
            rounds: rounds.clamp(MIN_ROUNDS, MAX_ROUNDS),
        }
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let params =
            Sha256Params::new(self.rounds).map_err(|err| PasswordError(format!("{err:?}")))?;
        sha256_simple(password, &params).map_err(|err| PasswordError(format!("{err:?}")))
    }

    fn verify(&self, password: &str, encoded: &str) -> bool {
        sha256_check(password, encoded).is_ok()
    }
}
