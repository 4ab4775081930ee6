//! Configuration error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a [`ConfigStore`](crate::ConfigStore)
/// or loading a [`Config`](crate::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Explicitly named configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Configuration file exists but could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Backing source present but unparsable.
    #[error("failed to parse configuration source: {0}")]
    Source(#[from] config::ConfigError),

    /// File extension does not map to a known format.
    #[error("unsupported configuration file format: {path}")]
    UnsupportedFormat {
        /// Path to the file.
        path: PathBuf,
    },

    /// A value is present but cannot be coerced to the requested type.
    #[error("invalid value for {key}: expected {expected}, got {value:?}")]
    Coercion {
        /// Dotted key that was read.
        key: String,
        /// Name of the expected type.
        expected: &'static str,
        /// Raw value found in the store.
        value: String,
    },

    /// One or more fields failed to load or validate.
    #[error("configuration is invalid: {0}")]
    Invalid(#[from] ValidationErrors),

    /// A custom section could not be deserialized into the requested type.
    #[error("failed to deserialize section {section}: {reason}")]
    Deserialize {
        /// Section name.
        section: String,
        /// Explanation of the failure.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new coercion error.
    pub fn coercion(key: impl Into<String>, expected: &'static str, value: impl Into<String>) -> Self {
        Self::Coercion {
            key: key.into(),
            expected,
            value: value.into(),
        }
    }

    /// Create a new deserialize error.
    pub fn deserialize(section: impl Into<String>, reason: impl ToString) -> Self {
        Self::Deserialize {
            section: section.into(),
            reason: reason.to_string(),
        }
    }
}

/// A single field that failed a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted key of the field (e.g. `db.type`).
    pub field: String,
    /// Why the field was rejected.
    pub reason: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every failure collected by a validation pass.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Whether no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The recorded failures, in the order they were found.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether any failure names `field`.
    pub fn contains_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/etc/app/config.ini");
        assert!(err.to_string().contains("/etc/app/config.ini"));
    }

    #[test]
    fn test_coercion_error() {
        let err = ConfigError::coercion("server.tls.enabled", "bool", "maybe");
        let msg = err.to_string();
        assert!(msg.contains("server.tls.enabled"));
        assert!(msg.contains("bool"));
        assert!(msg.contains("maybe"));
    }

    #[test]
    fn test_validation_errors_display_joins_fields() {
        let mut errors = ValidationErrors::new();
        errors.push(FieldError::new("db.type", "unsupported"));
        errors.push(FieldError::new("log.level", "unknown level"));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "db.type: unsupported; log.level: unknown level");
        assert!(errors.contains_field("log.level"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.push(FieldError::new("db.type", "unsupported"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_invalid_wraps_validation_errors() {
        let mut errors = ValidationErrors::new();
        errors.push(FieldError::new("redis.db", "expected unsigned integer"));
        let err: ConfigError = errors.into();
        assert!(err.to_string().contains("redis.db"));
    }
}
