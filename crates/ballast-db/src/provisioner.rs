//! Kind-to-setup registry and the provisioning sequence.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use ballast_config::{DbConfig, DbType};
use sqlx::migrate::MigrateError;
use tracing::{info, instrument, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::migrate::{SchemaMigrator, SqlxMigrator};
use crate::setup::DbSetup;

/// Connection pool handed out by provisioning.
pub type DbPool = sqlx::AnyPool;

/// Where provisioning ended up.
///
/// `Unconfigured` → `Connected` → (`Migrated` | `Skipped`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionState {
    /// Nothing has happened yet.
    Unconfigured,
    /// A pool is open; migrations have not been considered.
    Connected,
    /// Migrations ran (possibly as a no-op).
    Migrated,
    /// Migrations were disabled by configuration.
    Skipped,
}

impl ProvisionState {
    /// Whether provisioning is finished in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Migrated | Self::Skipped)
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unconfigured => "unconfigured",
            Self::Connected => "connected",
            Self::Migrated => "migrated",
            Self::Skipped => "skipped",
        })
    }
}

/// A provisioned database.
#[derive(Debug)]
pub struct Provisioned {
    /// Open connection pool.
    pub pool: DbPool,
    /// Terminal state reached.
    pub state: ProvisionState,
    /// Migration versions applied during this run.
    pub applied: Vec<i64>,
}

/// Connects to the configured database and brings its schema up to date.
///
/// Setup routines are looked up by [`DbType`]. Kinds without a registered
/// routine are rejected before any connection is attempted.
///
/// # Example
///
/// ```no_run
/// use ballast_config::{DbConfig, DbType};
/// use ballast_db::{DbProvisioner, ProvisionState};
///
/// # async fn run() -> Result<(), ballast_db::ProvisionError> {
/// let config = DbConfig {
///     kind: DbType::Sqlite,
///     dsn: "ledger.db".to_string(),
///     schema_path: "./migrations".to_string(),
///     migrate: true,
/// };
///
/// let db = DbProvisioner::new().provision(&config).await?;
/// assert_eq!(db.state, ProvisionState::Migrated);
/// # Ok(())
/// # }
/// ```
pub struct DbProvisioner {
    setups: HashMap<DbType, Arc<dyn DbSetup>>,
    migrator: Arc<dyn SchemaMigrator>,
}

impl DbProvisioner {
    /// Create a provisioner with every backend compiled into this build.
    pub fn new() -> Self {
        let provisioner = Self::empty();

        #[cfg(feature = "sqlite")]
        let provisioner = provisioner.with_setup(crate::setup::SqliteSetup::default());
        #[cfg(feature = "mysql")]
        let provisioner = provisioner.with_setup(crate::setup::ServerSetup::mysql());
        #[cfg(feature = "postgres")]
        let provisioner = provisioner.with_setup(crate::setup::ServerSetup::postgres());

        provisioner
    }

    /// Create a provisioner with no backends registered.
    pub fn empty() -> Self {
        Self {
            setups: HashMap::new(),
            migrator: Arc::new(SqlxMigrator),
        }
    }

    /// Register a setup routine, replacing any existing one for its kind.
    #[must_use]
    pub fn with_setup(mut self, setup: impl DbSetup + 'static) -> Self {
        self.setups.insert(setup.kind(), Arc::new(setup));
        self
    }

    /// Replace the migration driver.
    #[must_use]
    pub fn with_migrator(mut self, migrator: impl SchemaMigrator + 'static) -> Self {
        self.migrator = Arc::new(migrator);
        self
    }

    /// Whether a setup routine is registered for `kind`.
    pub fn supports(&self, kind: &DbType) -> bool {
        self.setups.contains_key(kind)
    }

    /// Registered kinds, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &DbType> {
        self.setups.keys()
    }

    /// Connect to the configured database and, if enabled, apply pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::UnsupportedDatabaseKind`] if no routine handles
    ///   `config.kind`; nothing is connected.
    /// - [`ProvisionError::ConnectionFailed`] if the pool cannot be opened.
    /// - [`ProvisionError::MigrationFailed`] if migrations fail. This one is
    ///   [fatal](ProvisionError::is_fatal).
    #[instrument(skip_all, fields(kind = %config.kind))]
    pub async fn provision(&self, config: &DbConfig) -> ProvisionResult<Provisioned> {
        let setup = self
            .setups
            .get(&config.kind)
            .ok_or_else(|| ProvisionError::UnsupportedDatabaseKind(config.kind.clone()))?;

        let pool = setup
            .connect(config)
            .await
            .map_err(|source| ProvisionError::ConnectionFailed {
                kind: config.kind.clone(),
                source,
            })?;
        let mut state = ProvisionState::Connected;
        info!(state = %state, "database connected");

        if !config.migrate {
            warn!("migrate database set to false, skipping migration");
            state = ProvisionState::Skipped;
            return Ok(Provisioned {
                pool,
                state,
                applied: Vec::new(),
            });
        }

        let path = Path::new(&config.schema_path);
        if config.schema_path.trim().is_empty() {
            return Err(ProvisionError::migration(
                path,
                MigrateError::Source("no migration directory configured (db.schema.path)".into()),
            ));
        }

        info!(path = %path.display(), "migrating database");
        let report = self
            .migrator
            .migrate(&pool, path)
            .await
            .map_err(|source| ProvisionError::migration(path, source))?;

        if report.is_noop() {
            info!("no pending migrations");
        } else {
            info!(applied = report.applied.len(), "migrating database completed");
        }

        state = ProvisionState::Migrated;
        Ok(Provisioned {
            pool,
            state,
            applied: report.applied,
        })
    }
}

impl Default for DbProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DbProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.setups.keys().map(DbType::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("DbProvisioner").field("kinds", &kinds).finish_non_exhaustive()
    }
}
