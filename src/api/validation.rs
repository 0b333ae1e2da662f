//! Per-field input validation, collected into one `Invalid input value.`
//! error whose data maps each failing field to its first message.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;
use crate::field::OptionalField;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$")
        .expect("email pattern is valid")
});

pub const MSG_BLANK: &str = "Cannot be blank.";
pub const MSG_NULL: &str = "Cannot be null.";
pub const MSG_EMAIL: &str = "Must be a valid email address.";
pub const MSG_NEGATIVE: &str = "Must be no less than 0.";

pub fn is_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_REGEX.is_match(value)
}

#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok`. Only the first failure per
    /// field is kept.
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok && !self.errors.contains_key(field) {
            self.errors.insert(field.to_string(), message.into());
        }
        self
    }

    /// Reject an explicit null on a column that cannot hold one.
    pub fn not_null<T>(&mut self, field: &str, value: &OptionalField<T>) -> &mut Self {
        self.check(field, !value.is_null(), MSG_NULL)
    }

    /// A required, non-blank string of at most `max` characters.
    pub fn text(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        self.check(field, !value.trim().is_empty(), MSG_BLANK);
        let len = value.chars().count();
        self.check(
            field,
            len <= max,
            format!("The length must be between 1 and {}.", max),
        )
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_email() {
        assert!(is_email("alice@example.com"));
        assert!(is_email("a.b+tag@sub.example.co"));
        assert!(!is_email("alice"));
        assert!(!is_email("alice@"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("alice@localhost"));
        assert!(!is_email("al ice@example.com"));
    }

    #[test]
    fn test_first_message_per_field_wins() {
        let err = FieldErrors::new()
            .check("subject", false, "first")
            .check("subject", false, "second")
            .finish()
            .unwrap_err();
        match err {
            AppError::Validation(fields) => assert_eq!(fields["subject"], "first"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_rules() {
        let err = FieldErrors::new().text("subject", "   ", 255).finish().unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f["subject"] == MSG_BLANK));

        let long = "x".repeat(256);
        let err = FieldErrors::new().text("subject", &long, 255).finish().unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref f) if f["subject"] == "The length must be between 1 and 255.")
        );

        assert!(FieldErrors::new().text("subject", "ok", 255).finish().is_ok());
    }

    #[test]
    fn test_not_null() {
        let err = FieldErrors::new()
            .not_null("priority", &OptionalField::<i32>::Null)
            .finish()
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f["priority"] == MSG_NULL));

        assert!(FieldErrors::new()
            .not_null("priority", &OptionalField::Value(1))
            .not_null("completed", &OptionalField::<bool>::Absent)
            .finish()
            .is_ok());
    }
}
