use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::error::ApiError;
use super::AppState;
use crate::error_log::ErrorLogView;

#[derive(Serialize)]
pub struct ErrorLogResponse {
    success: bool,
    count: usize,
    logs: Vec<ErrorLogView>,
}

/// Every stored error, across all users
pub async fn list_errors(State(state): State<AppState>) -> Result<Json<ErrorLogResponse>, ApiError> {
    let logs: Vec<ErrorLogView> = state
        .error_log
        .list()
        .await
        .map_err(ApiError::internal("Fetch Error Logs Error"))?
        .into_iter()
        .map(ErrorLogView::from)
        .collect();

    Ok(Json(ErrorLogResponse {
        success: true,
        count: logs.len(),
        logs,
    }))
}
