//! Integration tests for loading configuration from layered sources.
//!
//! These tests build a store from an on-disk INI file plus an injected
//! environment and check the resulting records end to end.

use std::io::Write;
use std::time::Duration;

use ballast_config::{ConfigError, ConfigLoader, ConfigStore, DbType};
use tempfile::NamedTempFile;

fn ini_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Every supported kind passes validation; anything else yields exactly one
/// failure naming `db.type`.
#[test]
fn test_db_kind_closed_set() {
    for kind in ["sqlite", "mysql", "postgres"] {
        let store = ConfigStore::builder().with_env_vars([("DB_TYPE", kind)]).build().unwrap();
        let config = ConfigLoader::new(&store).with_db().load().unwrap();
        assert!(config.validate().is_ok(), "{kind}");
    }

    for kind in ["oracle", "mssql", "postgresql", "sqlite|mysql"] {
        let store = ConfigStore::builder().with_env_vars([("DB_TYPE", kind)]).build().unwrap();
        let config = ConfigLoader::new(&store).with_db().load().unwrap();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1, "{kind}");
        assert_eq!(errors.errors()[0].field, "db.type");
    }
}

#[test]
fn test_environment_defaults_to_dev() {
    let store = ConfigStore::builder().build().unwrap();
    let deployment = ConfigLoader::new(&store)
        .with_deployment("ledger")
        .load()
        .unwrap()
        .deployment
        .unwrap();

    assert_eq!(deployment.environment, "dev");
    assert!(deployment.is_dev());
}

#[test]
fn test_prod_environment_is_not_dev() {
    let store = ConfigStore::builder()
        .with_env_vars([("ENV_ENVIRONMENT", "prod")])
        .build()
        .unwrap();
    let deployment = ConfigLoader::new(&store)
        .with_deployment("ledger")
        .load()
        .unwrap()
        .deployment
        .unwrap();

    assert!(!deployment.is_dev());
}

#[test]
fn test_cache_db_index_defaults_to_zero() {
    let store = ConfigStore::builder().build().unwrap();
    let cache = ConfigLoader::new(&store).with_cache().load().unwrap().cache.unwrap();
    assert_eq!(cache.db_index, 0);
}

/// Two named clients each see only their own namespaced keys.
#[test]
fn test_named_clients_do_not_cross_contaminate() {
    let store = ConfigStore::builder()
        .with_env_vars([
            ("A_CLIENT_HOST", "a.internal"),
            ("A_CLIENT_TLS_ENABLED", "true"),
            ("B_CLIENT_HOST", "b.internal"),
            ("B_CLIENT_PORT", "7000"),
            ("B_CLIENT_TIMEOUT", "5"),
        ])
        .build()
        .unwrap();

    let config = ConfigLoader::new(&store)
        .with_http_client("a")
        .with_http_client("b")
        .load()
        .unwrap();

    assert_eq!(config.http_clients().count(), 2);

    let a = config.http_client("a").unwrap();
    assert_eq!(a.host, "a.internal");
    assert_eq!(a.port, "");
    assert!(a.tls_enabled);
    assert_eq!(a.timeout, Duration::ZERO);

    let b = config.http_client("b").unwrap();
    assert_eq!(b.host, "b.internal");
    assert_eq!(b.port, "7000");
    assert!(!b.tls_enabled);
    assert_eq!(b.timeout, Duration::from_secs(5));
}

#[test]
fn test_ini_file_with_env_overrides() {
    let file = ini_file(
        r"
[server]
port = 8080
host = localhost
tls.enabled = false

[db]
type = sqlite
dsn = ledger.db
schema.path = ./migrations
migrate = true

[redis]
address = localhost:6379
db = 4

[billing]
client.host = billing.internal
client.timeout = 10
",
    );

    let store = ConfigStore::builder()
        .set_default("log.level", "info")
        .with_file(file.path())
        .unwrap()
        .with_env_vars([("SERVER_PORT", "9090"), ("DB_MIGRATE", "false")])
        .build()
        .unwrap();

    let config = ConfigLoader::new(&store)
        .with_server()
        .with_logging()
        .with_db()
        .with_cache()
        .with_http_client("billing")
        .load_validated()
        .unwrap();

    let server = config.server.as_ref().unwrap();
    assert_eq!(server.port, "9090");
    assert_eq!(server.hostname, "localhost");
    assert!(!server.tls_enabled);

    let db = config.db.as_ref().unwrap();
    assert_eq!(db.kind, DbType::Sqlite);
    assert_eq!(db.dsn, "ledger.db");
    assert_eq!(db.schema_path, "./migrations");
    assert!(!db.migrate);

    assert_eq!(config.cache.as_ref().unwrap().db_index, 4);
    assert_eq!(config.logging.as_ref().unwrap().level, "info");
    assert_eq!(
        config.http_client("billing").unwrap().timeout,
        Duration::from_secs(10)
    );
}

#[test]
fn test_explicit_file_missing_is_error_but_optional_is_not() {
    let missing = std::env::temp_dir().join("ballast-does-not-exist").join("config.ini");

    assert!(matches!(
        ConfigStore::builder().with_file(&missing),
        Err(ConfigError::FileNotFound { .. })
    ));
    assert!(ConfigStore::builder().with_optional_file(&missing).is_ok());
}

#[test]
fn test_malformed_ini_is_source_error() {
    let file = ini_file("[server\nport = 8080\n");
    let result = ConfigStore::builder().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::Source(_))));
}
