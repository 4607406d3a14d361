//! Database configuration
//!
//! Supports in-memory, embedded and remote SurrealDB connections.
//! Connection type is inferred from which fields are set.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Storage engine a [`DatabaseConfig`] resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    Memory,
    Embedded(PathBuf),
    Remote {
        url: String,
        username: String,
        password: String,
    },
}

/// Database configuration
///
/// Connection type is inferred:
/// - If `url` is `mem://` → in-memory engine, nothing persisted
/// - If `url` is set otherwise → remote connection
/// - If `path` is set (no `url`) → embedded SurrealKV
/// - If neither → use default embedded path
/// - If both → error (ambiguous)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path for embedded database
    pub path: Option<PathBuf>,

    /// URL for remote SurrealDB connection (e.g., "ws://localhost:8000")
    pub url: Option<String>,

    /// Namespace (defaults to "taskdeck")
    pub namespace: Option<String>,

    /// Username for remote connection
    pub username: Option<String>,

    /// Password for remote connection
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Create config for embedded database at the given path
    pub fn embedded(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Default::default()
        }
    }

    /// Create config for remote database
    pub fn remote(url: String, username: String, password: String) -> Self {
        Self {
            url: Some(url),
            username: Some(username),
            password: Some(password),
            ..Default::default()
        }
    }

    /// Create config for a throwaway in-memory database
    pub fn in_memory() -> Self {
        Self {
            url: Some("mem://".to_string()),
            ..Default::default()
        }
    }

    /// Check if this config points at the in-memory engine
    pub fn is_memory(&self) -> bool {
        self.url.as_deref().is_some_and(|u| u.starts_with("mem://"))
    }

    /// Check if this config is for a remote connection
    pub fn is_remote(&self) -> bool {
        self.url.is_some() && !self.is_memory()
    }

    /// Get the namespace (defaults to "taskdeck")
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("taskdeck")
    }

    /// Decide which engine to open, falling back to `default_path` when
    /// nothing is configured
    pub fn engine(&self, default_path: Option<PathBuf>) -> Result<Engine> {
        if self.url.is_some() && self.path.is_some() {
            bail!("Database config has both 'url' and 'path' set - this is ambiguous");
        }

        if self.is_memory() {
            return Ok(Engine::Memory);
        }

        if let Some(url) = &self.url {
            let username = self
                .username
                .clone()
                .context("Remote database requires 'username'")?;
            let password = self
                .password
                .clone()
                .context("Remote database requires 'password'")?;

            return Ok(Engine::Remote {
                url: url.clone(),
                username,
                password,
            });
        }

        self.path
            .clone()
            .or(default_path)
            .map(Engine::Embedded)
            .context("No database path specified and no default provided")
    }
}
