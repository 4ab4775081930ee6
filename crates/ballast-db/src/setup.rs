//! Per-kind connection routines.
//!
//! Each backend compiled into the crate contributes one [`DbSetup`]. Which
//! backends exist is decided by cargo features (`sqlite`, `mysql`,
//! `postgres`); [`DbProvisioner::new`](crate::DbProvisioner::new) registers
//! whatever is enabled.

use std::time::Duration;

use async_trait::async_trait;
use ballast_config::{DbConfig, DbType};
use sqlx::any::AnyPoolOptions;

use crate::DbPool;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens a connection pool for one database kind.
#[async_trait]
pub trait DbSetup: Send + Sync {
    /// The kind this routine handles.
    fn kind(&self) -> DbType;

    /// Open a pool for `config.dsn`.
    async fn connect(&self, config: &DbConfig) -> Result<DbPool, sqlx::Error>;
}

/// Pool sizing shared by every setup routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// How long `acquire` waits before giving up.
    pub acquire_timeout: Duration,
    /// Hold the connections open for the life of the pool. Required when the
    /// database lives only as long as its connection.
    pub pinned: bool,
}

impl PoolSettings {
    /// Create settings with the given connection cap.
    pub const fn new(max_connections: u32) -> Self {
        Self {
            max_connections,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            pinned: false,
        }
    }

    /// A single connection that is never reaped.
    pub const fn pinned() -> Self {
        Self {
            max_connections: 1,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            pinned: true,
        }
    }

    fn options(self) -> AnyPoolOptions {
        sqlx::any::install_default_drivers();
        let options = AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.pinned {
            options
                .min_connections(self.max_connections)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options
        }
    }
}

/// Embedded SQLite.
///
/// A bare file path is accepted as the DSN. The database file is created if
/// it does not exist yet.
#[cfg(feature = "sqlite")]
#[derive(Debug, Clone, Copy)]
pub struct SqliteSetup {
    pool: PoolSettings,
}

#[cfg(feature = "sqlite")]
impl Default for SqliteSetup {
    fn default() -> Self {
        Self {
            pool: PoolSettings::new(5),
        }
    }
}

#[cfg(feature = "sqlite")]
impl SqliteSetup {
    /// Use custom pool settings. In-memory databases always get one pinned
    /// connection.
    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    /// Turn a DSN into a `sqlite:` URL.
    pub fn normalize_dsn(dsn: &str) -> String {
        let dsn = dsn.trim();
        if dsn.starts_with("sqlite:") {
            dsn.to_string()
        } else if dsn.is_empty() || dsn == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{dsn}")
        }
    }

    fn is_memory(url: &str) -> bool {
        url.contains(":memory:") || url.contains("mode=memory")
    }
}

#[cfg(feature = "sqlite")]
#[async_trait]
impl DbSetup for SqliteSetup {
    fn kind(&self) -> DbType {
        DbType::Sqlite
    }

    async fn connect(&self, config: &DbConfig) -> Result<DbPool, sqlx::Error> {
        use sqlx::migrate::MigrateDatabase;

        let url = Self::normalize_dsn(&config.dsn);

        let pool = if Self::is_memory(&url) {
            // Every connection to :memory: is a separate database.
            PoolSettings {
                acquire_timeout: self.pool.acquire_timeout,
                ..PoolSettings::pinned()
            }
        } else {
            if !sqlx::Sqlite::database_exists(&url).await? {
                tracing::info!(url = %url, "creating sqlite database");
                sqlx::Sqlite::create_database(&url).await?;
            }
            self.pool
        };

        pool.options().connect(&url).await
    }
}

/// A client/server database reached over the network (MySQL, PostgreSQL).
///
/// The DSN must be a URL whose scheme matches the kind. The database itself
/// is expected to exist.
#[cfg(any(feature = "mysql", feature = "postgres"))]
#[derive(Debug, Clone)]
pub struct ServerSetup {
    kind: DbType,
    schemes: &'static [&'static str],
    pool: PoolSettings,
}

#[cfg(any(feature = "mysql", feature = "postgres"))]
impl ServerSetup {
    /// MySQL setup.
    #[cfg(feature = "mysql")]
    pub fn mysql() -> Self {
        Self {
            kind: DbType::MySql,
            schemes: &["mysql", "mariadb"],
            pool: PoolSettings::new(10),
        }
    }

    /// PostgreSQL setup.
    #[cfg(feature = "postgres")]
    pub fn postgres() -> Self {
        Self {
            kind: DbType::Postgres,
            schemes: &["postgres", "postgresql"],
            pool: PoolSettings::new(10),
        }
    }

    /// Use custom pool settings.
    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    fn check_scheme(&self, dsn: &str) -> Result<(), sqlx::Error> {
        let scheme = dsn.split_once("://").map(|(scheme, _)| scheme);
        match scheme {
            Some(scheme) if self.schemes.contains(&scheme) => Ok(()),
            _ => Err(sqlx::Error::Configuration(
                format!(
                    "{} dsn must start with one of {}",
                    self.kind,
                    self.schemes
                        .iter()
                        .map(|s| format!("{s}://"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
                .into(),
            )),
        }
    }
}

#[cfg(any(feature = "mysql", feature = "postgres"))]
#[async_trait]
impl DbSetup for ServerSetup {
    fn kind(&self) -> DbType {
        self.kind.clone()
    }

    async fn connect(&self, config: &DbConfig) -> Result<DbPool, sqlx::Error> {
        let dsn = config.dsn.trim();
        self.check_scheme(dsn)?;
        self.pool.options().connect(dsn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_dsn_normalization() {
        assert_eq!(SqliteSetup::normalize_dsn("ledger.db"), "sqlite://ledger.db");
        assert_eq!(SqliteSetup::normalize_dsn("/var/lib/ledger.db"), "sqlite:///var/lib/ledger.db");
        assert_eq!(SqliteSetup::normalize_dsn("sqlite://ledger.db"), "sqlite://ledger.db");
        assert_eq!(SqliteSetup::normalize_dsn(":memory:"), "sqlite::memory:");
        assert_eq!(SqliteSetup::normalize_dsn(""), "sqlite::memory:");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_memory_detection() {
        assert!(SqliteSetup::is_memory("sqlite::memory:"));
        assert!(SqliteSetup::is_memory("sqlite://file?mode=memory"));
        assert!(!SqliteSetup::is_memory("sqlite://ledger.db"));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn test_postgres_scheme_check() {
        let setup = ServerSetup::postgres();
        assert_eq!(setup.kind(), DbType::Postgres);
        assert!(setup.check_scheme("postgres://localhost/ledger").is_ok());
        assert!(setup.check_scheme("postgresql://localhost/ledger").is_ok());

        let err = setup.check_scheme("mysql://localhost/ledger").unwrap_err();
        assert!(err.to_string().contains("postgres://"));
        assert!(setup.check_scheme("localhost/ledger").is_err());
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_mysql_scheme_check() {
        let setup = ServerSetup::mysql();
        assert_eq!(setup.kind(), DbType::MySql);
        assert!(setup.check_scheme("mysql://root@localhost/ledger").is_ok());
        assert!(setup.check_scheme("postgres://localhost/ledger").is_err());
    }

    #[test]
    fn test_pinned_pool_is_never_reaped() {
        let options = PoolSettings::pinned().options();
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);
    }

    #[test]
    fn test_unpinned_pool_keeps_reaper_defaults() {
        let options = PoolSettings::new(5).options();
        assert_eq!(options.get_min_connections(), 0);
        assert!(options.get_idle_timeout().is_some());
    }

    #[test]
    fn test_pool_settings_default_timeout() {
        let settings = PoolSettings::new(3);
        assert_eq!(settings.max_connections, 3);
        assert_eq!(settings.acquire_timeout, DEFAULT_ACQUIRE_TIMEOUT);
    }
}
