//! Field-level validation errors shared by every record form.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One failed field check, rendered inline next to the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field failures collected from one submission.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single-field failure.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the first message recorded for `field`.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub(crate) fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "This field is required.");
        }
    }

    pub(crate) fn require_selection(&mut self, field: &'static str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == BLANK_CHOICE {
            self.push(field, "Please select");
        }
    }

    pub(crate) fn require_range(&mut self, field: &'static str, value: i64, min: i64, max: i64) {
        if !(min..=max).contains(&value) {
            self.push(field, format!("Must be between {min} and {max}"));
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Placeholder value of an unselected dropdown.
pub const BLANK_CHOICE: &str = "blank";

#[cfg(test)]
mod tests {
    use super::ValidationErrors;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.require("name", "  ");
        errors.require_selection("work_package", "blank");
        errors.require_range("percent", 101, 0, 100);

        assert_eq!(errors.errors().len(), 3);
        assert_eq!(errors.message_for("name"), Some("This field is required."));
        assert_eq!(errors.message_for("work_package"), Some("Please select"));
        assert_eq!(
            errors.message_for("percent"),
            Some("Must be between 0 and 100")
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn empty_collection_is_ok() {
        let mut errors = ValidationErrors::new();
        errors.require("name", "Leeds");
        errors.require_range("month_due", 51, 0, 51);
        assert!(errors.into_result().is_ok());
    }
}
