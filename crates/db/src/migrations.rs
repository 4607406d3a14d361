//! Schema migrations
//!
//! Each migration is a `.surql` file keyed by a unix timestamp. The record
//! `schema_version:current` holds the timestamp of the last one applied, and
//! a migration is written together with its version bump in one transaction.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct SchemaVersion {
    version: i64,
}

struct Migration {
    timestamp: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        timestamp: 1759276800,
        name: "account_schema",
        sql: include_str!("../migrations/taskdeck/1759276800_account_schema.surql"),
    },
    Migration {
        timestamp: 1759363200,
        name: "task_schema",
        sql: include_str!("../migrations/taskdeck/1759363200_task_schema.surql"),
    },
    Migration {
        timestamp: 1759449600,
        name: "error_log_schema",
        sql: include_str!("../migrations/taskdeck/1759449600_error_log_schema.surql"),
    },
];

/// Timestamp of the newest migration this build knows about
pub(crate) fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.timestamp).unwrap_or(0)
}

/// Apply pending migrations, returning the resulting schema version
///
/// A database migrated by a newer build is refused rather than opened.
pub(crate) async fn run_migrations(db: &Surreal<Any>) -> Result<i64> {
    let current = current_version(db).await?;
    let latest = latest_version();

    if current > latest {
        bail!(
            "Database schema version {} is newer than this build supports ({}); upgrade taskdeck",
            current,
            latest
        );
    }

    for migration in MIGRATIONS.iter().filter(|m| m.timestamp > current) {
        info!("Applying migration {}: {}", migration.timestamp, migration.name);
        apply(db, migration).await?;
    }

    Ok(latest)
}

async fn apply(db: &Surreal<Any>, migration: &Migration) -> Result<()> {
    let statement = format!(
        "BEGIN TRANSACTION;\n{}\nUPSERT schema_version:current CONTENT {{ version: $version }};\nCOMMIT TRANSACTION;",
        migration.sql
    );

    db.query(statement)
        .bind(("version", migration.timestamp))
        .await
        .and_then(|response| response.check())
        .with_context(|| {
            format!(
                "Failed to apply migration {} ({})",
                migration.timestamp, migration.name
            )
        })?;

    Ok(())
}

/// Schema version recorded in the database, 0 when none was ever applied
pub(crate) async fn current_version(db: &Surreal<Any>) -> Result<i64> {
    db.query("DEFINE TABLE IF NOT EXISTS schema_version SCHEMAFULL; DEFINE FIELD IF NOT EXISTS version ON schema_version TYPE int;")
        .await
        .and_then(|response| response.check())
        .context("Failed to ensure schema_version table")?;

    let result: Option<SchemaVersion> = db
        .select(("schema_version", "current"))
        .await
        .context("Failed to query schema version")?;

    Ok(result.map(|r| r.version).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh() -> Surreal<Any> {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("test").use_db("taskdeck").await.unwrap();
        db
    }

    #[test]
    fn test_migrations_are_ordered() {
        let timestamps: Vec<i64> = MIGRATIONS.iter().map(|m| m.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(timestamps, sorted);
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let db = fresh().await;

        assert_eq!(run_migrations(&db).await.unwrap(), latest_version());
        assert_eq!(run_migrations(&db).await.unwrap(), latest_version());
        assert_eq!(current_version(&db).await.unwrap(), latest_version());
    }

    #[tokio::test]
    async fn test_unique_email_index_is_installed() {
        let db = fresh().await;
        run_migrations(&db).await.unwrap();

        db.query("CREATE account SET email = 'a@b.co'")
            .await
            .unwrap()
            .check()
            .unwrap();
        let duplicate = db
            .query("CREATE account SET email = 'a@b.co'")
            .await
            .and_then(|response| response.check());

        let err = duplicate.unwrap_err();
        assert!(err.to_string().contains("account_email"));
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let db = fresh().await;
        run_migrations(&db).await.unwrap();

        db.query("UPSERT schema_version:current CONTENT { version: $version }")
            .bind(("version", latest_version() + 1))
            .await
            .unwrap()
            .check()
            .unwrap();

        let err = run_migrations(&db).await.unwrap_err();
        assert!(err.to_string().contains("newer than this build"));
    }
}
