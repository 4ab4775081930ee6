//! The configuration aggregate.
//!
//! [`Config`] holds one optional record per subsystem. It is produced by the
//! [`ConfigLoader`](crate::ConfigLoader) (or assembled directly with
//! [`Config::builder`]) and is immutable afterwards, so it can be shared
//! behind an `Arc` by any number of readers.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::schema::keys;
use crate::{
    CacheConfig, ConfigError, DbConfig, Deployment, HttpClientConfig, InstrumentationConfig,
    LoggingConfig, ServerConfig, SwaggerConfig, ValidationErrors, Validator, LOG_LEVELS,
};

/// Strongly typed configuration.
///
/// # Example
///
/// ```
/// use ballast_config::{Config, DbConfig, DbType};
///
/// let config = Config::builder()
///     .db(DbConfig {
///         kind: DbType::Sqlite,
///         dsn: "sqlite::memory:".to_string(),
///         ..Default::default()
///     })
///     .build();
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Web server settings.
    pub server: Option<ServerConfig>,
    /// Deployment information.
    pub deployment: Option<Deployment>,
    /// Logging settings.
    pub logging: Option<LoggingConfig>,
    /// Database settings.
    pub db: Option<DbConfig>,
    /// Redis cache settings.
    pub cache: Option<CacheConfig>,
    /// Swagger settings.
    pub swagger: Option<SwaggerConfig>,
    /// Metrics/tracing toggles.
    pub instrumentation: Option<InstrumentationConfig>,
    pub(crate) http_clients: HashMap<String, HttpClientConfig>,
    pub(crate) custom: HashMap<String, BTreeMap<String, String>>,
}

fn db_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(crate::DbType::PATTERN).unwrap_or_else(|e| unreachable!("invalid db type pattern: {e}"))
    })
}

// `level` or `target=level`, comma separated.
fn is_log_directive(value: &str) -> bool {
    value
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .all(|directive| {
            let (target, level) = match directive.rsplit_once('=') {
                Some((target, level)) => (Some(target), level),
                None => (None, directive),
            };
            let target_ok = target.map_or(true, |t| {
                !t.is_empty()
                    && t.chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
            });
            target_ok && LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        })
}

impl Config {
    /// Create a builder for assembling a configuration by hand.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Settings of the named HTTP client, if it was registered.
    pub fn http_client(&self, name: &str) -> Option<&HttpClientConfig> {
        self.http_clients.get(name)
    }

    /// Every registered HTTP client.
    pub fn http_clients(&self) -> impl Iterator<Item = (&str, &HttpClientConfig)> {
        self.http_clients.iter().map(|(name, cfg)| (name.as_str(), cfg))
    }

    /// Raw keys of a custom section, if it was registered.
    pub fn custom_section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.custom.get(name)
    }

    /// Deserialize a custom section into `T`.
    ///
    /// Returns `Ok(None)` when no section called `name` was registered.
    /// Values are coerced from strings, so `"true"` fills a `bool` field and
    /// `"3"` fills an integer.
    ///
    /// # Example
    ///
    /// ```
    /// use ballast_config::{ConfigLoader, ConfigStore};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Payments {
    ///     endpoint: String,
    ///     retries: u32,
    /// }
    ///
    /// let store = ConfigStore::builder()
    ///     .set_default("payments.endpoint", "https://pay.example")
    ///     .set_default("payments.retries", "3")
    ///     .build()
    ///     .unwrap();
    ///
    /// let config = ConfigLoader::new(&store).with_custom("payments").load().unwrap();
    /// let payments: Payments = config.custom("payments").unwrap().unwrap();
    /// assert_eq!(payments.retries, 3);
    /// ```
    pub fn custom<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let Some(section) = self.custom.get(name) else {
            return Ok(None);
        };

        let mut builder = config::Config::builder();
        for (key, value) in section {
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }

        builder
            .build()?
            .try_deserialize()
            .map(Some)
            .map_err(|e| ConfigError::deserialize(name, e))
    }

    /// Run every field check and return all failures.
    ///
    /// Checks:
    /// - `db.type` must be one of `sqlite`, `mysql`, `postgres`
    /// - `log.level`, when set, must be a level or a comma-separated list of
    ///   `target=level` directives
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut validator = Validator::new();

        if let Some(db) = &self.db {
            validator = validator.matches(keys::DB_TYPE, db.kind.as_str(), db_type_pattern());
        }

        if let Some(logging) = &self.logging {
            validator = validator.check(
                keys::LOG_LEVEL,
                is_log_directive(&logging.level),
                format!("unknown log level {:?}", logging.level),
            );
        }

        validator.finish()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder with every section unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = Some(server);
        self
    }

    /// Set the deployment section.
    #[must_use]
    pub fn deployment(mut self, deployment: Deployment) -> Self {
        self.config.deployment = Some(deployment);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = Some(logging);
        self
    }

    /// Set the database section.
    #[must_use]
    pub fn db(mut self, db: DbConfig) -> Self {
        self.config.db = Some(db);
        self
    }

    /// Set the cache section.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = Some(cache);
        self
    }

    /// Set the swagger section.
    #[must_use]
    pub fn swagger(mut self, swagger: SwaggerConfig) -> Self {
        self.config.swagger = Some(swagger);
        self
    }

    /// Set the instrumentation section.
    #[must_use]
    pub fn instrumentation(mut self, instrumentation: InstrumentationConfig) -> Self {
        self.config.instrumentation = Some(instrumentation);
        self
    }

    /// Register a named HTTP client.
    #[must_use]
    pub fn http_client(mut self, name: impl Into<String>, client: HttpClientConfig) -> Self {
        self.config.http_clients.insert(name.into(), client);
        self
    }

    /// Register a named custom section.
    #[must_use]
    pub fn custom(mut self, name: impl Into<String>, section: BTreeMap<String, String>) -> Self {
        self.config.custom.insert(name.into(), section);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` with every failing field.
    pub fn build_validated(self) -> Result<Config, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
