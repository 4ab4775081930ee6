//! Field-level validation.
//!
//! A [`Validator`] runs every check it is given and collects the failures
//! instead of stopping at the first one.
//!
//! ```
//! use ballast_config::Validator;
//! use regex::Regex;
//!
//! let kinds = Regex::new("^(sqlite|mysql|postgres)$").unwrap();
//! let result = Validator::new()
//!     .matches("db.type", "oracle", &kinds)
//!     .check("server.port", true, "must be set")
//!     .finish();
//!
//! let errors = result.unwrap_err();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.errors()[0].field, "db.type");
//! ```

use regex::Regex;

use crate::{FieldError, ValidationErrors};

/// Accumulates field failures.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    /// Create a validator with no failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `reason` against `field` unless `ok` holds.
    #[must_use]
    pub fn check(mut self, field: &str, ok: bool, reason: impl Into<String>) -> Self {
        if !ok {
            self.errors.push(FieldError::new(field, reason));
        }
        self
    }

    /// Record a failure against `field` unless `value` matches `pattern`.
    #[must_use]
    pub fn matches(self, field: &str, value: &str, pattern: &Regex) -> Self {
        let ok = pattern.is_match(value);
        self.check(
            field,
            ok,
            format!("value {value:?} does not match {}", pattern.as_str()),
        )
    }

    /// `Ok(())` if every check passed, otherwise all failures.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_checks_is_ok() {
        assert!(Validator::new().finish().is_ok());
    }

    #[test]
    fn test_collects_every_failure() {
        let pattern = Regex::new("^a$").unwrap();
        let errors = Validator::new()
            .check("one", false, "first")
            .matches("two", "b", &pattern)
            .check("three", true, "unused")
            .finish()
            .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors()[0].field, "one");
        assert_eq!(errors.errors()[1].field, "two");
        assert!(errors.errors()[1].reason.contains("^a$"));
    }
}
