//! Database store for tasks
//!
//! Every lookup is scoped to an owning account; a task that belongs to
//! someone else is indistinguishable from a missing one.

use anyhow::{Context, Result};
use chrono::Utc;
use db::Database;
use surrealdb::sql::Thing;
use tracing::debug;

use crate::models::Task;
use crate::reconcile::{NewTask, TaskPatch};

/// Database store for tasks
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Create a new store with the given database connection
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database connection
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create a new task for `owner`
    pub async fn create_task(&self, owner: &Thing, input: NewTask) -> Result<Task> {
        let task = input.into_task(owner.clone(), Utc::now());

        let created: Option<Task> = self
            .db
            .client()
            .create("task")
            .content(task)
            .await
            .context("Failed to create task")?;

        created.context("Task creation returned no result")
    }

    /// List all tasks of `owner`, oldest first
    pub async fn list_tasks(&self, owner: &Thing) -> Result<Vec<Task>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM task WHERE owner = $owner ORDER BY created_at ASC")
            .bind(("owner", owner.clone()))
            .await
            .context("Failed to query tasks")?;

        let mut tasks: Vec<Task> = response.take(0).context("Failed to parse tasks")?;
        tasks.sort_by_key(|t| t.created_at);
        debug!("Loaded {} task(s) for {}", tasks.len(), owner);

        Ok(tasks)
    }

    /// Get a task by ID if it belongs to `owner`
    pub async fn get_task(&self, owner: &Thing, id: &str) -> Result<Option<Task>> {
        let task: Option<Task> = self
            .db
            .client()
            .select(("task", id))
            .await
            .context("Failed to get task")?;

        Ok(task.filter(|t| t.is_owned_by(owner)))
    }

    /// Apply a partial update; last write wins
    pub async fn update_task(
        &self,
        owner: &Thing,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>> {
        let Some(mut task) = self.get_task(owner, id).await? else {
            return Ok(None);
        };

        patch.apply(&mut task, Utc::now());
        task.id = None;

        let updated: Option<Task> = self
            .db
            .client()
            .update(("task", id))
            .content(task)
            .await
            .context("Failed to update task")?;

        Ok(updated)
    }

    /// Permanently delete a task
    pub async fn delete_task(&self, owner: &Thing, id: &str) -> Result<Option<Task>> {
        if self.get_task(owner, id).await?.is_none() {
            return Ok(None);
        }

        let deleted: Option<Task> = self
            .db
            .client()
            .delete(("task", id))
            .await
            .context("Failed to delete task")?;

        Ok(deleted)
    }
}
