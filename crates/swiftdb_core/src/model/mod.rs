//! Domain model for project records.
//!
//! # Responsibility
//! - Define record read models and typed write inputs.
//! - Define the closed set of table kinds and their form layouts.
//! - Hold intrinsic (store-independent) validation rules.
//!
//! # Invariants
//! - Every record is identified by a store-assigned numeric `RecordId`.
//! - Natural keys (code/name/username) are unique per table.

pub mod record;
pub mod table;
pub mod validation;
