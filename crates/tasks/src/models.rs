//! Core task types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use thiserror::Error;

use crate::reconcile::to_external;

/// Rejected task input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field")]
    MissingField,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid deadline: {0}")]
    InvalidDeadline(String),
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ValidationError::InvalidPriority(other.to_string())),
        }
    }
}

/// Task status as persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,
    /// Being worked on
    InProgress,
    /// Finished
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Task status as exposed over the API
///
/// `Done` has no stored counterpart; it is written as [`TaskStatus::Completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExternalStatus {
    Todo,
    InProgress,
    Done,
}

impl fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

impl FromStr for ExternalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// A stored task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Record id (set by database)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    /// Owning account
    pub owner: Thing,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
    pub status: TaskStatus,
    /// Maintained alongside `status`; the two are not forced to agree on create
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Raw record key, without the table prefix
    pub fn id_str(&self) -> Option<String> {
        self.id.as_ref().map(|t| t.id.to_raw())
    }

    /// Raw record key of the owning account
    pub fn owner_id(&self) -> String {
        self.owner.id.to_raw()
    }

    pub fn is_owned_by(&self, owner: &Thing) -> bool {
        self.owner == *owner
    }
}

/// A task as returned to API clients
///
/// A detached copy of the stored record with `status` translated to the
/// external vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
    pub status: ExternalStatus,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Completed by either signal
    pub fn is_done(&self) -> bool {
        self.completed || self.status == ExternalStatus::Done
    }
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id_str().unwrap_or_default(),
            user_id: task.owner_id(),
            title: task.title.clone(),
            description: task.description.clone(),
            deadline: task.deadline,
            priority: task.priority,
            status: to_external(task.status),
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Parse a deadline sent by a client
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) and
/// bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(ValidationError::InvalidDeadline(input.to_string()))
}
