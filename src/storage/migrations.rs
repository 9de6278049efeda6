//! Versioned, additive schema migrations.
//!
//! Applied versions are tracked in `schema_migrations`. Opening at a version
//! applies each missing migration up to that version in its own transaction;
//! opening at an equal or lower version changes nothing.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// A single schema step. Every step only creates what does not exist yet.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Known migrations in version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "responses",
        sql: include_str!("../../migrations/0001_responses.sql"),
    },
    Migration {
        version: 2,
        name: "registrations",
        sql: include_str!("../../migrations/0002_registrations.sql"),
    },
];

/// Highest schema version this build knows how to create.
pub const LATEST_SCHEMA_VERSION: i64 = 2;

async fn init_migration_table(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| StorageError::Migration {
        message: format!("Failed to create schema_migrations table: {}", e),
    })?;
    Ok(())
}

/// Current schema version (0 for a fresh database).
pub async fn current_version(pool: &SqlitePool) -> StorageResult<i64> {
    init_migration_table(pool).await?;
    let (version,): (i64,) =
        sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to read schema version: {}", e),
            })?;
    Ok(version)
}

/// Bring the schema up to `target`, returning the resulting version.
pub async fn migrate_to(pool: &SqlitePool, target: i64) -> StorageResult<i64> {
    let current = current_version(pool).await?;
    if target <= current {
        debug!(current, target, "Schema already at or above requested version");
        return Ok(current);
    }
    if target > LATEST_SCHEMA_VERSION {
        warn!(
            target,
            latest = LATEST_SCHEMA_VERSION,
            "Requested schema version is newer than any known migration"
        );
    }

    let mut version = current;
    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current && m.version <= target)
    {
        apply(pool, migration).await?;
        version = migration.version;
    }

    info!(from = current, to = version, "Database schema upgraded");
    Ok(version)
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> StorageResult<()> {
    let failed = |e: sqlx::Error| StorageError::Migration {
        message: format!(
            "Migration {} '{}' failed: {}",
            migration.version, migration.name, e
        ),
    };

    let mut tx = pool.begin().await.map_err(failed)?;
    sqlx::raw_sql(migration.sql)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    tx.commit().await.map_err(failed)?;

    debug!(
        version = migration.version,
        name = migration.name,
        "Applied migration"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_contiguous() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i64 + 1);
        }
        assert_eq!(
            MIGRATIONS.last().map(|m| m.version),
            Some(LATEST_SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_migrations_are_additive() {
        for migration in MIGRATIONS {
            let sql = migration.sql.to_uppercase();
            assert!(!sql.contains("DROP "), "{} drops objects", migration.name);
            assert!(!sql.contains("DELETE "), "{} deletes rows", migration.name);
            assert!(!sql.contains("UPDATE "), "{} rewrites rows", migration.name);
        }
    }
}
