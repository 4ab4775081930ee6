//! Startup with logging enabled when the host already owns the subscriber.
//!
//! Kept in its own test binary: the global subscriber can be set once per
//! process.

use std::fs;

use ballast::db::ProvisionState;
use ballast::telemetry::{init_logging, LogConfig};
use ballast::Startup;
use tempfile::TempDir;

#[tokio::test]
async fn test_existing_subscriber_does_not_stop_startup() {
    init_logging(&LogConfig::production()).unwrap();
    // A second install fails; the service must still come up.
    assert!(init_logging(&LogConfig::production()).is_err());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ini");
    fs::write(&path, "[log]\nlevel = debug\n").unwrap();

    let service = Startup::new("ledger")
        .with_config_file(&path)
        .with_env_vars([
            ("ENV_ENVIRONMENT", "prod"),
            ("DB_TYPE", "sqlite"),
            ("DB_DSN", ":memory:"),
            ("DB_MIGRATE", "false"),
        ])
        .run()
        .await
        .unwrap();

    assert_eq!(service.db.state, ProvisionState::Skipped);
    assert_eq!(service.config.logging.as_ref().unwrap().level, "debug");
}
