//! Typed configuration for Ballast services.
//!
//! This crate turns flat, environment-derived settings into strongly typed
//! records:
//! - [`ConfigStore`] - layered key/value source (defaults → file → env → overrides)
//! - [`ConfigLoader`] - fluent reader producing a [`Config`] aggregate
//! - [`Config::validate`] - field checks that report every failure at once
//!
//! # Example
//!
//! ```no_run
//! use ballast_config::{ConfigLoader, ConfigStore};
//!
//! # fn main() -> Result<(), ballast_config::ConfigError> {
//! let store = ConfigStore::builder()
//!     .with_search_paths("ledger")?
//!     .with_environment()
//!     .build()?;
//!
//! let config = ConfigLoader::new(&store)
//!     .with_server()
//!     .with_deployment("ledger")
//!     .with_logging()
//!     .with_db()
//!     .with_cache()
//!     .with_http_client("billing")
//!     .load_validated()?;
//!
//! println!("{}", config.deployment.unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! INI sections become key prefixes:
//!
//! ```ini
//! [server]
//! port = 8080
//! tls.enabled = false
//!
//! [db]
//! type = postgres
//! dsn = postgres://localhost/ledger
//! schema.path = ./migrations
//! migrate = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every key can be overridden by an environment variable named after it,
//! upper-cased with dots replaced by underscores:
//!
//! - `SERVER_PORT=9000`
//! - `DB_SCHEMA_PATH=/srv/migrations`
//! - `BILLING_CLIENT_TIMEOUT=30`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;
mod store;
mod validation;

pub use crate::config::{Config, ConfigBuilder};
pub use error::{ConfigError, FieldError, ValidationErrors};
pub use loader::{ConfigLoader, DEFAULT_BUILD_FIELD, DEFAULT_ENVIRONMENT};
pub use schema::*;
pub use store::{ConfigStore, ConfigStoreBuilder, DEFAULT_FILE_NAME};
pub use validation::Validator;

/// File formats accepted by [`ConfigStoreBuilder::with_string`].
pub use ::config::FileFormat;
