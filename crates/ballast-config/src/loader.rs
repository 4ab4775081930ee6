//! Fluent configuration loader.
//!
//! This module provides the [`ConfigLoader`], which reads one subsystem at a
//! time from a [`ConfigStore`] into a [`Config`].

use chrono::Utc;

use crate::schema::keys;
use crate::{
    CacheConfig, Config, ConfigError, ConfigStore, DbConfig, DbType, Deployment, FieldError,
    HttpClientConfig, InstrumentationConfig, LoggingConfig, ServerConfig, SwaggerConfig,
    ValidationErrors,
};

/// Default environment when `env.environment` is unset.
pub const DEFAULT_ENVIRONMENT: &str = Deployment::DEV;

/// Default region, version and commit when unset.
pub const DEFAULT_BUILD_FIELD: &str = "test";

/// Reads configuration sections from a [`ConfigStore`].
///
/// Every `with_*` call reads a fixed set of keys and stores the resulting
/// record. Values that cannot be coerced are collected and reported together
/// by [`load`](Self::load).
///
/// `load` consumes the loader, so a loader cannot be reused once built.
///
/// # Example
///
/// ```
/// use ballast_config::{ConfigLoader, ConfigStore};
///
/// # fn main() -> Result<(), ballast_config::ConfigError> {
/// let store = ConfigStore::builder()
///     .with_env_vars([
///         ("SERVER_PORT", "8080"),
///         ("DB_TYPE", "sqlite"),
///         ("DB_DSN", "sqlite::memory:"),
///     ])
///     .build()?;
///
/// let config = ConfigLoader::new(&store)
///     .with_server()
///     .with_deployment("ledger")
///     .with_db()
///     .load_validated()?;
///
/// assert_eq!(config.server.unwrap().port, "8080");
/// assert!(config.deployment.unwrap().is_dev());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader<'a> {
    store: &'a ConfigStore,
    config: Config,
    errors: ValidationErrors,
}

impl<'a> ConfigLoader<'a> {
    /// Create a loader over `store` with every section unset.
    #[must_use]
    pub fn new(store: &'a ConfigStore) -> Self {
        Self {
            store,
            config: Config::default(),
            errors: ValidationErrors::new(),
        }
    }

    /// Read the web server section.
    #[must_use]
    pub fn with_server(mut self) -> Self {
        let server = ServerConfig {
            port: self.store.string_value(keys::SERVER_PORT),
            hostname: self.store.string_value(keys::SERVER_HOST),
            tls_enabled: self.read(keys::SERVER_TLS_ENABLED, ConfigStore::bool_value),
            tls_cert_path: self.store.string_value(keys::SERVER_TLS_CERT),
            pprof_enabled: self.read(keys::SERVER_PPROF_ENABLED, ConfigStore::bool_value),
        };
        self.config.server = Some(server);
        self
    }

    /// Read the deployment section.
    ///
    /// Unset fields fall back to `dev` (environment), `test` (region, version,
    /// commit) and the current UTC time (build date).
    #[must_use]
    pub fn with_deployment(mut self, app_name: &str) -> Self {
        let build_date = if self.store.is_set(keys::ENV_BUILD_DATE) {
            self.read(keys::ENV_BUILD_DATE, ConfigStore::time_value)
        } else {
            Utc::now()
        };

        let deployment = Deployment {
            environment: self.store.get_or(keys::ENV_ENVIRONMENT, DEFAULT_ENVIRONMENT).to_string(),
            app_name: app_name.to_string(),
            region: self.store.get_or(keys::ENV_REGION, DEFAULT_BUILD_FIELD).to_string(),
            version: self.store.get_or(keys::ENV_VERSION, DEFAULT_BUILD_FIELD).to_string(),
            commit: self.store.get_or(keys::ENV_COMMIT, DEFAULT_BUILD_FIELD).to_string(),
            build_date,
        };
        self.config.deployment = Some(deployment);
        self
    }

    /// Read the logging section.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.config.logging = Some(LoggingConfig {
            level: self.store.string_value(keys::LOG_LEVEL),
        });
        self
    }

    /// Read the database section.
    #[must_use]
    pub fn with_db(mut self) -> Self {
        let db = DbConfig {
            kind: DbType::from(self.store.string_value(keys::DB_TYPE)),
            dsn: self.store.string_value(keys::DB_DSN),
            schema_path: self.store.string_value(keys::DB_SCHEMA_PATH),
            migrate: self.read(keys::DB_MIGRATE, ConfigStore::bool_value),
        };
        self.config.db = Some(db);
        self
    }

    /// Read the redis cache section. `redis.db` defaults to 0.
    #[must_use]
    pub fn with_cache(mut self) -> Self {
        let db_index = self.read(keys::REDIS_DB, ConfigStore::uint_value);
        let db_index = match u32::try_from(db_index) {
            Ok(index) => index,
            Err(_) => {
                self.errors.push(FieldError::new(keys::REDIS_DB, "database index out of range"));
                0
            }
        };

        self.config.cache = Some(CacheConfig {
            address: self.store.string_value(keys::REDIS_ADDRESS),
            password: self.store.string_value(keys::REDIS_PASSWORD),
            db_index,
        });
        self
    }

    /// Read the swagger section.
    #[must_use]
    pub fn with_swagger(mut self) -> Self {
        self.config.swagger = Some(SwaggerConfig {
            host: self.store.string_value(keys::SWAGGER_HOST),
            enabled: self.read(keys::SWAGGER_ENABLED, ConfigStore::bool_value),
        });
        self
    }

    /// Read the metrics and tracing toggles.
    #[must_use]
    pub fn with_instrumentation(mut self) -> Self {
        self.config.instrumentation = Some(InstrumentationConfig {
            metrics_enabled: self.read(keys::METRICS_ENABLED, ConfigStore::bool_value),
            tracing_enabled: self.read(keys::TRACING_ENABLED, ConfigStore::bool_value),
        });
        self
    }

    /// Read the HTTP client registered under `name` from the
    /// `{name}.client.*` keys. Clients with different names do not affect
    /// each other; registering the same name again replaces it.
    #[must_use]
    pub fn with_http_client(mut self, name: &str) -> Self {
        let client = HttpClientConfig {
            host: self.store.string_value(&keys::client_host(name)),
            port: self.store.string_value(&keys::client_port(name)),
            tls_enabled: self.read(&keys::client_tls_enabled(name), ConfigStore::bool_value),
            tls_cert_present: self.read(&keys::client_tls_cert(name), ConfigStore::bool_value),
            timeout: self.read(&keys::client_timeout(name), ConfigStore::duration_value),
        };
        self.config.http_clients.insert(name.to_string(), client);
        self
    }

    /// Capture every key under `{name}.` as a custom section, to be read
    /// later with [`Config::custom`].
    #[must_use]
    pub fn with_custom(mut self, name: &str) -> Self {
        let section = self.store.section(name);
        self.config.custom.insert(name.to_string(), section);
        self
    }

    /// Finish loading and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` listing every key whose value could not
    /// be coerced.
    pub fn load(self) -> Result<Config, ConfigError> {
        if !self.errors.is_empty() {
            tracing::warn!(failures = self.errors.len(), "configuration values could not be read");
            return Err(ConfigError::Invalid(self.errors));
        }
        Ok(self.config)
    }

    /// Finish loading, then run [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` with coercion failures, or with every
    /// validation failure.
    pub fn load_validated(self) -> Result<Config, ConfigError> {
        let config = self.load()?;
        config.validate()?;
        Ok(config)
    }

    // Reads a typed value, recording a failure and falling back to the zero
    // value if coercion fails.
    fn read<T: Default>(
        &mut self,
        key: &str,
        get: impl Fn(&ConfigStore, &str) -> Result<T, ConfigError>,
    ) -> T {
        match get(self.store, key) {
            Ok(value) => value,
            Err(e) => {
                self.errors.push(FieldError::new(key, e.to_string()));
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store(vars: &[(&str, &str)]) -> ConfigStore {
        ConfigStore::builder()
            .with_env_vars(vars.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn test_loader_nothing_requested() {
        let store = store(&[]);
        let config = ConfigLoader::new(&store).load().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_with_server() {
        let store = store(&[
            ("SERVER_PORT", "8443"),
            ("SERVER_HOST", "api.example"),
            ("SERVER_TLS_ENABLED", "true"),
            ("SERVER_TLS_CERT", "/etc/tls/cert.pem"),
            ("SERVER_PPROF_ENABLED", "0"),
        ]);

        let server = ConfigLoader::new(&store).with_server().load().unwrap().server.unwrap();
        assert_eq!(server.port, "8443");
        assert_eq!(server.hostname, "api.example");
        assert!(server.tls_enabled);
        assert_eq!(server.tls_cert_path, "/etc/tls/cert.pem");
        assert!(!server.pprof_enabled);
    }

    #[test]
    fn test_with_deployment_defaults() {
        let store = store(&[]);
        let before = Utc::now();
        let deployment = ConfigLoader::new(&store)
            .with_deployment("ledger")
            .load()
            .unwrap()
            .deployment
            .unwrap();

        assert_eq!(deployment.environment, "dev");
        assert!(deployment.is_dev());
        assert_eq!(deployment.app_name, "ledger");
        assert_eq!(deployment.region, "test");
        assert_eq!(deployment.version, "test");
        assert_eq!(deployment.commit, "test");
        assert!(deployment.build_date >= before);
    }

    #[test]
    fn test_with_deployment_from_store() {
        let store = store(&[
            ("ENV_ENVIRONMENT", "prod"),
            ("ENV_REGION", "eu-west-1"),
            ("ENV_VERSION", "2.0.1"),
            ("ENV_COMMIT", "deadbeef"),
            ("ENV_BUILDDATE", "2024-02-29T10:00:00Z"),
        ]);

        let deployment = ConfigLoader::new(&store)
            .with_deployment("ledger")
            .load()
            .unwrap()
            .deployment
            .unwrap();

        assert!(!deployment.is_dev());
        assert_eq!(deployment.region, "eu-west-1");
        assert_eq!(deployment.build_date.to_rfc3339(), "2024-02-29T10:00:00+00:00");
    }

    #[test]
    fn test_with_db() {
        let store = store(&[
            ("DB_TYPE", "postgres"),
            ("DB_DSN", "postgres://localhost/ledger"),
            ("DB_SCHEMA_PATH", "migrations"),
            ("DB_MIGRATE", "true"),
        ]);

        let db = ConfigLoader::new(&store).with_db().load().unwrap().db.unwrap();
        assert_eq!(db.kind, DbType::Postgres);
        assert_eq!(db.dsn, "postgres://localhost/ledger");
        assert_eq!(db.schema_path, "migrations");
        assert!(db.migrate);
    }

    #[test]
    fn test_with_db_unsupported_kind_loads_but_fails_validation() {
        let store = store(&[("DB_TYPE", "oracle")]);

        let config = ConfigLoader::new(&store).with_db().load().unwrap();
        assert_eq!(config.db.as_ref().unwrap().kind, DbType::Unsupported("oracle".into()));

        let result = ConfigLoader::new(&store).with_db().load_validated();
        assert!(matches!(result, Err(ConfigError::Invalid(ref e)) if e.contains_field("db.type")));
    }

    #[test]
    fn test_with_cache_defaults_db_index() {
        let store = store(&[("REDIS_ADDRESS", "localhost:6379")]);
        let cache = ConfigLoader::new(&store).with_cache().load().unwrap().cache.unwrap();
        assert_eq!(cache.address, "localhost:6379");
        assert_eq!(cache.password, "");
        assert_eq!(cache.db_index, 0);
    }

    #[test]
    fn test_with_cache_out_of_range() {
        let store = store(&[("REDIS_DB", "4294967296")]);
        let result = ConfigLoader::new(&store).with_cache().load();
        assert!(matches!(result, Err(ConfigError::Invalid(ref e)) if e.contains_field("redis.db")));
    }

    #[test]
    fn test_with_swagger_and_instrumentation() {
        let store = store(&[
            ("SWAGGER_HOST", "docs.example"),
            ("SWAGGER_ENABLED", "yes"),
            ("METRICS_ENABLED", "true"),
        ]);

        let config = ConfigLoader::new(&store)
            .with_swagger()
            .with_instrumentation()
            .load()
            .unwrap();

        let swagger = config.swagger.unwrap();
        assert_eq!(swagger.host, "docs.example");
        assert!(swagger.enabled);

        let instrumentation = config.instrumentation.unwrap();
        assert!(instrumentation.metrics_enabled);
        assert!(!instrumentation.tracing_enabled);
    }

    #[test]
    fn test_with_http_client() {
        let store = store(&[
            ("BILLING_CLIENT_HOST", "billing.internal"),
            ("BILLING_CLIENT_PORT", "9000"),
            ("BILLING_CLIENT_TIMEOUT", "30"),
            ("BILLING_CLIENT_TLS_ENABLED", "true"),
            ("BILLING_CLIENT_TLS_CERT", "false"),
        ]);

        let config = ConfigLoader::new(&store).with_http_client("billing").load().unwrap();
        let client = config.http_client("billing").unwrap();
        assert_eq!(client.host, "billing.internal");
        assert_eq!(client.port, "9000");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert!(client.tls_enabled);
        assert!(!client.tls_cert_present);
    }

    #[test]
    fn test_coercion_failures_are_all_reported() {
        let store = store(&[
            ("SERVER_TLS_ENABLED", "maybe"),
            ("DB_MIGRATE", "sometimes"),
            ("BILLING_CLIENT_TIMEOUT", "soon"),
        ]);

        let result = ConfigLoader::new(&store)
            .with_server()
            .with_db()
            .with_http_client("billing")
            .load();

        let Err(ConfigError::Invalid(errors)) = result else {
            panic!("expected coercion failures");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_field("server.tls.enabled"));
        assert!(errors.contains_field("db.migrate"));
        assert!(errors.contains_field("billing.client.timeout"));
    }

    #[test]
    fn test_with_custom() {
        let store = store(&[("FEATURES_BETA", "true")]);
        let config = ConfigLoader::new(&store).with_custom("features").load().unwrap();

        let section = config.custom_section("features").unwrap();
        assert_eq!(section.get("beta").map(String::as_str), Some("true"));
    }
}
