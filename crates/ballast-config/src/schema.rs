//! Configuration record types.
//!
//! One record per subsystem. Records are plain data; they are filled from a
//! [`ConfigStore`](crate::ConfigStore) by the [`ConfigLoader`](crate::ConfigLoader).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dotted keys recognised by the loader.
pub mod keys {
    /// Server port.
    pub const SERVER_PORT: &str = "server.port";
    /// Server hostname.
    pub const SERVER_HOST: &str = "server.host";
    /// Serve over TLS.
    pub const SERVER_TLS_ENABLED: &str = "server.tls.enabled";
    /// TLS certificate path.
    pub const SERVER_TLS_CERT: &str = "server.tls.cert";
    /// Expose profiling endpoints.
    pub const SERVER_PPROF_ENABLED: &str = "server.pprof.enabled";

    /// Swagger host.
    pub const SWAGGER_HOST: &str = "swagger.host";
    /// Serve swagger docs.
    pub const SWAGGER_ENABLED: &str = "swagger.enabled";

    /// Metrics toggle.
    pub const METRICS_ENABLED: &str = "metrics.enabled";
    /// Tracing toggle.
    pub const TRACING_ENABLED: &str = "tracing.enabled";

    /// Deployment environment name.
    pub const ENV_ENVIRONMENT: &str = "env.environment";
    /// Deployment region.
    pub const ENV_REGION: &str = "env.region";
    /// Deployed version.
    pub const ENV_VERSION: &str = "env.version";
    /// Deployed commit.
    pub const ENV_COMMIT: &str = "env.commit";
    /// Build timestamp.
    pub const ENV_BUILD_DATE: &str = "env.builddate";

    /// Log level.
    pub const LOG_LEVEL: &str = "log.level";

    /// Database kind.
    pub const DB_TYPE: &str = "db.type";
    /// Database connection string.
    pub const DB_DSN: &str = "db.dsn";
    /// Migration directory.
    pub const DB_SCHEMA_PATH: &str = "db.schema.path";
    /// Run migrations at startup.
    pub const DB_MIGRATE: &str = "db.migrate";

    /// Redis address.
    pub const REDIS_ADDRESS: &str = "redis.address";
    /// Redis password.
    pub const REDIS_PASSWORD: &str = "redis.password";
    /// Redis database index.
    pub const REDIS_DB: &str = "redis.db";

    /// Host of the named client.
    pub fn client_host(name: &str) -> String {
        format!("{name}.client.host")
    }

    /// Port of the named client.
    pub fn client_port(name: &str) -> String {
        format!("{name}.client.port")
    }

    /// Timeout (seconds) of the named client.
    pub fn client_timeout(name: &str) -> String {
        format!("{name}.client.timeout")
    }

    /// TLS toggle of the named client.
    pub fn client_tls_enabled(name: &str) -> String {
        format!("{name}.client.tls.enabled")
    }

    /// Whether the named client presents a certificate.
    pub fn client_tls_cert(name: &str) -> String {
        format!("{name}.client.tls.cert")
    }
}

/// Log level names accepted by validation, alone or as `target=level`.
pub const LOG_LEVELS: [&str; 6] = ["off", "trace", "debug", "info", "warn", "error"];

/// Web server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: String,
    /// Hostname to bind or advertise.
    pub hostname: String,
    /// Serve over TLS.
    pub tls_enabled: bool,
    /// Path to the TLS certificate.
    pub tls_cert_path: String,
    /// Expose profiling endpoints.
    pub pprof_enabled: bool,
}

/// Information about the running deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deployment {
    /// Environment name (`dev`, `staging`, `prod`, ...).
    pub environment: String,
    /// Application name supplied by the caller.
    pub app_name: String,
    /// Region the instance runs in.
    pub region: String,
    /// Application version.
    pub version: String,
    /// Source commit.
    pub commit: String,
    /// Build timestamp.
    pub build_date: DateTime<Utc>,
}

impl Deployment {
    /// Name of the development environment.
    pub const DEV: &'static str = "dev";

    /// Whether this is a development deployment.
    pub fn is_dev(&self) -> bool {
        self.environment == Self::DEV
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Environment: {}", self.environment)?;
        writeln!(f, "AppName: {}", self.app_name)?;
        writeln!(f, "Region: {}", self.region)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Commit: {}", self.commit)?;
        write!(f, "BuildDate: {}", self.build_date.to_rfc3339())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level, or `target=level` directives such as `ballast_db=debug,sqlx=warn`.
    pub level: String,
}

/// Supported database kinds.
///
/// Any other declared value is kept as [`DbType::Unsupported`] so it can be
/// reported by validation and by the provisioner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DbType {
    /// SQLite.
    Sqlite,
    /// MySQL / MariaDB.
    MySql,
    /// PostgreSQL.
    Postgres,
    /// Anything outside the supported set.
    Unsupported(String),
}

impl DbType {
    /// Pattern the declared kind must match.
    pub const PATTERN: &'static str = "^(sqlite|mysql|postgres)$";

    /// The supported kinds.
    pub const SUPPORTED: [DbType; 3] = [DbType::Sqlite, DbType::MySql, DbType::Postgres];

    /// The declared name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Unsupported(other) => other,
        }
    }

    /// Whether this kind is in the supported set.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl FromStr for DbType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sqlite" => Self::Sqlite,
            "mysql" => Self::MySql,
            "postgres" => Self::Postgres,
            other => Self::Unsupported(other.to_string()),
        })
    }
}

impl From<String> for DbType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for DbType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<DbType> for String {
    fn from(value: DbType) -> Self {
        value.as_str().to_string()
    }
}

impl Default for DbType {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbConfig {
    /// Database kind.
    pub kind: DbType,
    /// Connection string.
    pub dsn: String,
    /// Directory holding migration scripts.
    pub schema_path: String,
    /// Apply pending migrations when provisioning.
    pub migrate: bool,
}

/// Redis cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// `host:port` of the server.
    pub address: String,
    /// Password, empty for none.
    pub password: String,
    /// Database index.
    pub db_index: u32,
}

/// Swagger docs settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwaggerConfig {
    /// Host shown in the docs.
    pub host: String,
    /// Serve the docs.
    pub enabled: bool,
}

/// Metrics and tracing toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentationConfig {
    /// Collect metrics.
    pub metrics_enabled: bool,
    /// Export traces.
    pub tracing_enabled: bool,
}

/// Settings of a named outbound HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Remote host.
    pub host: String,
    /// Remote port.
    pub port: String,
    /// Use TLS.
    pub tls_enabled: bool,
    /// Present a client certificate.
    pub tls_cert_present: bool,
    /// Request timeout.
    pub timeout: Duration,
}
