//! Logging setup for Ballast services.
//!
//! Installs a global `tracing` subscriber whose shape follows the deployment:
//!
//! - **dev**: pretty, multi-line output with span events and source locations
//! - **anything else**: JSON lines suitable for log shipping
//!
//! The filter comes from `RUST_LOG` when set, otherwise from `log.level`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ballast_telemetry::{init_logging, log_deployment, LogConfig};
//!
//! let deployment = config.deployment.as_ref().unwrap();
//! init_logging(&LogConfig::for_deployment(deployment, config.logging.as_ref()))?;
//! log_deployment(deployment);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

use ballast_config::Deployment;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Emits the deployment banner as one structured event.
pub fn log_deployment(deployment: &Deployment) {
    tracing::info!(
        app = %deployment.app_name,
        environment = %deployment.environment,
        region = %deployment.region,
        version = %deployment.version,
        commit = %deployment.commit,
        build_date = %deployment.build_date.to_rfc3339(),
        "deployment"
    );
}
