//! # Ballast
//!
//! **Typed service configuration and database provisioning**
//!
//! Ballast turns layered settings (INI file, environment, `.env`) into
//! validated, strongly typed records and brings the configured database up:
//!
//! - **Configuration**: [`ConfigStore`](config::ConfigStore) and
//!   [`ConfigLoader`](config::ConfigLoader) from `ballast-config`
//! - **Database**: [`DbProvisioner`](db::DbProvisioner) from `ballast-db`
//! - **Logging**: pretty or JSON `tracing` output from `ballast-telemetry`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ballast::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StartupError> {
//!     let service = Startup::new("ledger")
//!         .with_http_client("billing")
//!         .run_or_exit()
//!         .await?;
//!
//!     let billing = service.config.http_client("billing");
//!     // service.db.pool is ready to use
//!     Ok(())
//! }
//! ```
//!
//! ## Sequence
//!
//! ```text
//! sources → ConfigStore → ConfigLoader → validate → logging → provision
//!                                                              ↓
//!                                    Unconfigured → Connected → Migrated | Skipped
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod startup;

// Re-export configuration types
pub use ballast_config as config;

// Re-export database types
pub use ballast_db as db;

// Re-export logging types
pub use ballast_telemetry as telemetry;

pub use startup::{Service, Startup, StartupError};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use ballast::prelude::*;
/// ```
pub mod prelude {
    pub use ballast_config::{
        CacheConfig, Config, ConfigError, ConfigLoader, ConfigStore, DbConfig, DbType, Deployment,
        HttpClientConfig, LoggingConfig, ServerConfig, ValidationErrors,
    };

    pub use ballast_db::{DbPool, DbProvisioner, ProvisionError, ProvisionState, Provisioned};

    pub use ballast_telemetry::{init_logging, LogConfig};

    pub use crate::startup::{Service, Startup, StartupError};
}
