//! Provisioning error types.

use std::path::PathBuf;

use ballast_config::DbType;
use thiserror::Error;

/// Errors that can occur while provisioning a database.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No setup routine is registered for the requested kind.
    #[error("database type {0} not supported")]
    UnsupportedDatabaseKind(DbType),

    /// Opening the connection pool failed.
    #[error("failed to connect to {kind} database: {source}")]
    ConnectionFailed {
        /// Kind being provisioned.
        kind: DbType,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Applying migrations failed. The database may be between versions.
    #[error("failed to migrate database from {}: {source}", .path.display())]
    MigrationFailed {
        /// Migration directory.
        path: PathBuf,
        /// Underlying migration error.
        #[source]
        source: sqlx::migrate::MigrateError,
    },
}

impl ProvisionError {
    /// Whether startup must abort rather than continue without the database.
    ///
    /// Only migration failures are fatal: the schema may be half applied.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MigrationFailed { .. })
    }

    /// Create a new migration failure.
    pub fn migration(path: impl Into<PathBuf>, source: sqlx::migrate::MigrateError) -> Self {
        Self::MigrationFailed {
            path: path.into(),
            source,
        }
    }
}

/// Result type for provisioning operations.
pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_display() {
        let err = ProvisionError::UnsupportedDatabaseKind(DbType::from("oracle"));
        assert_eq!(err.to_string(), "database type oracle not supported");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_connection_failed_not_fatal() {
        let err = ProvisionError::ConnectionFailed {
            kind: DbType::Postgres,
            source: sqlx::Error::PoolTimedOut,
        };
        assert!(err.to_string().contains("postgres"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_migration_failed_is_fatal() {
        let err = ProvisionError::migration(
            "/srv/migrations",
            sqlx::migrate::MigrateError::VersionMissing(3),
        );
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/srv/migrations"));
    }
}
