//! Database connection management
//!
//! Every taskdeck process talks to a single database, `taskdeck`, inside the
//! configured namespace. The engine behind it is picked at runtime.

use std::path::PathBuf;

use anyhow::{Context, Result};
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::info;

use crate::config::{DatabaseConfig, Engine};
use crate::migrations;

/// Database name used inside the configured namespace
pub const DATABASE_NAME: &str = "taskdeck";

/// Migrated connection to the taskdeck database
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct Database {
    client: Surreal<Any>,
}

impl Database {
    /// Open the configured engine, select the database and apply pending
    /// migrations. `default_path` is used for the embedded engine when the
    /// config names neither a `url` nor a `path`.
    pub async fn connect(config: &DatabaseConfig, default_path: Option<PathBuf>) -> Result<Self> {
        let client = open(config.engine(default_path)?).await?;

        let namespace = config.namespace();
        client
            .use_ns(namespace)
            .use_db(DATABASE_NAME)
            .await
            .context("Failed to select namespace/database")?;

        let version = migrations::run_migrations(&client).await?;
        info!(
            "Database {}/{} ready at schema version {}",
            namespace, DATABASE_NAME, version
        );

        Ok(Self { client })
    }

    /// Open a fresh in-memory database with all migrations applied
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig::in_memory(), None).await
    }

    /// Get a reference to the SurrealDB client
    pub fn client(&self) -> &Surreal<Any> {
        &self.client
    }

    /// Version of the newest migration applied to this database
    pub async fn schema_version(&self) -> Result<i64> {
        migrations::current_version(&self.client).await
    }
}

async fn open(engine: Engine) -> Result<Surreal<Any>> {
    match engine {
        Engine::Memory => {
            info!("Opening in-memory database");
            any::connect("mem://")
                .await
                .context("Failed to open in-memory database")
        }
        Engine::Embedded(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }

            info!("Opening embedded database at: {}", path.display());
            any::connect(format!("surrealkv://{}", path.display()))
                .await
                .context("Failed to open embedded database")
        }
        Engine::Remote {
            url,
            username,
            password,
        } => {
            info!("Connecting to remote database: {}", url);
            let client = any::connect(url.as_str())
                .await
                .context("Failed to connect to remote database")?;

            client
                .signin(Root {
                    username: &username,
                    password: &password,
                })
                .await
                .context("Failed to authenticate with remote database")?;

            Ok(client)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_is_fully_migrated() {
        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::latest_version());
    }

    #[tokio::test]
    async fn test_in_memory_databases_are_isolated() {
        let a = Database::in_memory().await.unwrap();
        let b = Database::in_memory().await.unwrap();

        a.client()
            .query("CREATE task:one SET title = 'only in a'")
            .await
            .unwrap();

        let mut response = b.client().query("SELECT VALUE title FROM task").await.unwrap();
        let titles: Vec<String> = response.take(0).unwrap();
        assert!(titles.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_ambiguous_config() {
        let config = DatabaseConfig {
            url: Some("ws://localhost:8000".to_string()),
            path: Some(PathBuf::from("/tmp/taskdeck")),
            ..Default::default()
        };

        assert!(Database::connect(&config, None).await.is_err());
    }
}
