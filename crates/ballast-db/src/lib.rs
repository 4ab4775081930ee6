//! Database provisioning for Ballast services.
//!
//! Given a validated [`DbConfig`](ballast_config::DbConfig), [`DbProvisioner`]
//! picks the setup routine registered for the configured kind, opens a
//! connection pool and, when `db.migrate` is set, applies pending schema
//! migrations from `db.schema.path`.
//!
//! Backends are selected at compile time with cargo features:
//!
//! | Feature    | Kind       |
//! |------------|------------|
//! | `sqlite`   | `sqlite`   |
//! | `mysql`    | `mysql`    |
//! | `postgres` | `postgres` |
//!
//! All three are enabled by default.
//!
//! A directory with nothing left to apply is success, not an error. Any other
//! migration failure is reported as [`ProvisionError::MigrationFailed`], which
//! callers should treat as fatal.

#![warn(missing_docs)]

mod error;
mod migrate;
mod provisioner;
mod setup;

pub use error::{ProvisionError, ProvisionResult};
pub use migrate::{MigrationReport, SchemaMigrator, SqlxMigrator};
pub use provisioner::{DbPool, DbProvisioner, ProvisionState, Provisioned};
#[cfg(any(feature = "mysql", feature = "postgres"))]
pub use setup::ServerSetup;
#[cfg(feature = "sqlite")]
pub use setup::SqliteSetup;
pub use setup::{DbSetup, PoolSettings, DEFAULT_ACQUIRE_TIMEOUT};

/// Migration error type surfaced by [`SchemaMigrator`].
pub use sqlx::migrate::MigrateError;
