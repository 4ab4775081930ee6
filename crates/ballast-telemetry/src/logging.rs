//! Structured logging for Ballast services.
//!
//! Development deployments get human-readable output; everything else gets
//! one JSON object per line.
//!
//! # Example
//!
//! ```rust,ignore
//! use ballast_telemetry::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::for_deployment(&deployment, config.logging.as_ref());
//! init_logging(&config)?;
//!
//! tracing::info!(app = %deployment.app_name, "starting");
//! ```

use ballast_config::{Deployment, LoggingConfig};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::{TelemetryError, TelemetryResult};

/// Level used when `log.level` is unset.
pub const DEFAULT_LEVEL: &str = "info";

/// How the global subscriber is built.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Install nothing when false.
    pub enabled: bool,
    /// Level or `target=level` directives, e.g. `ballast_db=debug,sqlx=warn`.
    pub level: String,
    /// Let `RUST_LOG` replace `level` when it is set and parses.
    pub honor_rust_log: bool,
    /// JSON lines instead of the pretty formatter.
    pub json_format: bool,
    /// Emit span open/close events.
    pub span_events: bool,
    /// Record source file and line.
    pub file_line_info: bool,
    /// Record the event target.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// JSON at `info`, no span events or source locations.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: DEFAULT_LEVEL.to_string(),
            honor_rust_log: true,
            json_format: true,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }

    /// Pretty output at `debug` with span events and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ..Self::production()
        }
    }

    /// Picks the preset for the deployment environment, then applies the
    /// configured level if one is set.
    #[must_use]
    pub fn for_deployment(deployment: &Deployment, logging: Option<&LoggingConfig>) -> Self {
        let mut config = if deployment.is_dev() {
            Self::development()
        } else {
            Self::production()
        };

        if let Some(level) = logging.map(|l| l.level.trim()).filter(|l| !l.is_empty()) {
            config.level = level.to_string();
        }
        config
    }

    /// Builds the filter this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::LoggingInit` if the directive does not parse.
    pub fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        if self.honor_rust_log {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        create_env_filter(&self.level)
    }
}

/// Installs the global subscriber described by `config`.
///
/// Exactly one output layer is active: JSON lines, or the pretty formatter.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the level is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = config.env_filter()?;
    let spans = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let json = config.json_format.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(spans.clone())
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
    });
    let pretty = (!config.json_format).then(|| {
        fmt::layer()
            .pretty()
            .with_span_events(spans)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses a filter directive such as `info` or `ballast_db=debug,sqlx=warn`.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` naming the bad directive.
pub fn create_env_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log level {directive:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(environment: &str) -> Deployment {
        Deployment {
            environment: environment.to_string(),
            app_name: "ledger".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_presets_differ_only_in_presentation() {
        let prod = LogConfig::default();
        let dev = LogConfig::development();

        assert_eq!((prod.json_format, prod.level.as_str()), (true, "info"));
        assert_eq!((dev.json_format, dev.level.as_str()), (false, "debug"));
        assert!(dev.span_events && dev.file_line_info);
        assert_eq!(prod.honor_rust_log, dev.honor_rust_log);
        assert_eq!(prod.include_target, dev.include_target);
    }

    #[test]
    fn test_dev_deployment_is_pretty() {
        let config = LogConfig::for_deployment(&deployment("dev"), None);
        assert!(!config.json_format);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_prod_deployment_is_json_with_configured_level() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
        };
        let config = LogConfig::for_deployment(&deployment("prod"), Some(&logging));
        assert!(config.json_format);
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn test_blank_level_keeps_preset() {
        let logging = LoggingConfig {
            level: "  ".to_string(),
        };
        let config = LogConfig::for_deployment(&deployment("staging"), Some(&logging));
        assert_eq!(config.level, DEFAULT_LEVEL);
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("ballast_db=debug,sqlx=warn").is_ok());
        assert!(create_env_filter("ballast=loud").is_err());
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let off = LogConfig {
            enabled: false,
            level: "ballast=loud".to_string(),
            ..LogConfig::production()
        };
        // The bad directive is never parsed.
        assert!(init_logging(&off).is_ok());
    }
}
