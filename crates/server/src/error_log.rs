//! Persistent log of internal errors
//!
//! Handlers never write here directly. An internal [`ApiError`] attaches an
//! [`ErrorRecord`] to its response and [`record_errors`] stores it together
//! with the request line and, when known, the authenticated user.
//!
//! [`ApiError`]: crate::web::error::ApiError

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use db::Database;
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use tracing::warn;

use crate::web::auth::SessionUserId;
use crate::web::error::ErrorRecord;
use crate::web::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    /// Short label of the failing operation
    pub message: String,
    pub error: String,
    pub stack: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorLog {
    pub fn new(record: ErrorRecord, endpoint: String, method: String, user_id: Option<String>) -> Self {
        Self {
            id: None,
            message: record.message,
            error: record.error,
            stack: Some(record.stack),
            endpoint: Some(endpoint),
            method: Some(method),
            user_id,
            timestamp: Utc::now(),
        }
    }
}

/// Error log entry as returned to API clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogView {
    #[serde(rename = "_id")]
    pub id: String,
    pub message: String,
    pub error: String,
    pub stack: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<ErrorLog> for ErrorLogView {
    fn from(log: ErrorLog) -> Self {
        Self {
            id: log.id.map(|t| t.id.to_raw()).unwrap_or_default(),
            message: log.message,
            error: log.error,
            stack: log.stack,
            endpoint: log.endpoint,
            method: log.method,
            user_id: log.user_id,
            timestamp: log.timestamp,
        }
    }
}

/// Database store for error log entries
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn record(&self, entry: ErrorLog) -> Result<ErrorLog> {
        let created: Option<ErrorLog> = self
            .db
            .client()
            .create("error_log")
            .content(entry)
            .await
            .context("Failed to write error log")?;

        created.context("Error log creation returned no result")
    }

    /// All entries, newest first
    pub async fn list(&self) -> Result<Vec<ErrorLog>> {
        let mut response = self
            .db
            .client()
            .query("SELECT * FROM error_log ORDER BY timestamp DESC")
            .await
            .context("Failed to query error log")?;

        let mut logs: Vec<ErrorLog> = response.take(0).context("Failed to parse error log")?;
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }
}

/// Persist internal errors raised anywhere below this layer
pub async fn record_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let mut response = next.run(request).await;

    if let Some(record) = response.extensions_mut().remove::<ErrorRecord>() {
        let user_id = response
            .extensions()
            .get::<SessionUserId>()
            .map(|u| u.0.clone());
        let entry = ErrorLog::new(record, endpoint, method, user_id);

        if let Err(e) = state.error_log.record(entry).await {
            warn!("Failed to persist error log entry: {:#}", e);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord {
            message: message.to_string(),
            error: "boom".to_string(),
            stack: "boom\n\nCaused by: disk".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let store = Store::new(Database::in_memory().await.unwrap());

        store
            .record(ErrorLog::new(record("first"), "/api/task".into(), "GET".into(), None))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .record(ErrorLog::new(
                record("second"),
                "/api/task/create".into(),
                "POST".into(),
                Some("abc".into()),
            ))
            .await
            .unwrap();

        let logs = store.list().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "second");
        assert_eq!(logs[0].user_id.as_deref(), Some("abc"));
        assert_eq!(logs[1].message, "first");
    }

    #[test]
    fn test_view_shape() {
        let mut log = ErrorLog::new(record("x"), "/".into(), "GET".into(), Some("u1".into()));
        log.id = Some(Thing::from(("error_log", "e1")));

        let json = serde_json::to_value(ErrorLogView::from(log)).unwrap();
        assert_eq!(json["_id"], "e1");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["method"], "GET");
    }
}
