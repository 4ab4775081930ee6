//! Schema migration driver.
//!
//! Migrations are read from a directory in the `sqlx` layout
//! (`<version>_<description>.sql`, or `.up.sql`/`.down.sql` pairs) and applied
//! in ascending version order. A directory whose migrations are all applied
//! is a successful no-op.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use sqlx::migrate::{Migrate, MigrateError, Migrator};

use crate::DbPool;

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied by this run, ascending. Empty for a no-op run.
    pub applied: Vec<i64>,
}

impl MigrationReport {
    /// Whether nothing was pending.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Applies pending migrations to an open pool.
#[async_trait]
pub trait SchemaMigrator: Send + Sync {
    /// Apply every pending migration found in `schema_path`.
    async fn migrate(&self, pool: &DbPool, schema_path: &Path) -> Result<MigrationReport, MigrateError>;
}

/// [`SchemaMigrator`] backed by `sqlx::migrate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxMigrator;

#[async_trait]
impl SchemaMigrator for SqlxMigrator {
    async fn migrate(&self, pool: &DbPool, schema_path: &Path) -> Result<MigrationReport, MigrateError> {
        let migrator = Migrator::new(schema_path).await?;

        let applied: HashSet<i64> = {
            let mut conn = pool.acquire().await?;
            conn.ensure_migrations_table().await?;
            conn.list_applied_migrations()
                .await?
                .into_iter()
                .map(|m| m.version)
                .collect()
        };

        let mut pending: Vec<i64> = migrator
            .iter()
            .filter(|m| !m.migration_type.is_down_migration())
            .map(|m| m.version)
            .filter(|version| !applied.contains(version))
            .collect();
        pending.sort_unstable();

        tracing::debug!(
            path = %schema_path.display(),
            known = migrator.iter().count(),
            pending = pending.len(),
            "resolved migrations"
        );

        migrator.run(pool).await?;

        Ok(MigrationReport { applied: pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_report() {
        assert!(MigrationReport::default().is_noop());
        assert!(!MigrationReport { applied: vec![1] }.is_noop());
    }
}
