//! Credential primitives.
//!
//! # Responsibility
//! - Hash and verify passwords behind the `PasswordHasher` seam.
//!
//! # Invariants
//! - Plaintext passwords are never stored, logged or compared directly.

pub mod password;
