use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tasks::{parse_deadline, NewTask, TaskPatch, TaskStatistics, TaskView, ValidationError};

use super::auth::CurrentUser;
use super::error::{ApiError, JsonBody};
use super::AppState;

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    deadline: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    completed: Option<bool>,
}

impl CreateTaskRequest {
    fn into_new_task(self) -> Result<NewTask, ValidationError> {
        let title = non_blank(self.title).ok_or(ValidationError::MissingField)?;
        let deadline = non_blank(self.deadline).ok_or(ValidationError::MissingField)?;
        let priority = non_blank(self.priority).ok_or(ValidationError::MissingField)?;

        Ok(NewTask {
            title,
            description: self.description,
            deadline: parse_deadline(&deadline)?,
            priority: priority.parse()?,
            status: non_blank(self.status).map(|s| s.parse()).transpose()?,
            completed: self.completed,
        })
    }
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    /// `null` clears, absent keeps
    #[serde(default, deserialize_with = "present")]
    description: Option<Option<String>>,
    deadline: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    completed: Option<bool>,
}

impl UpdateTaskRequest {
    /// Empty strings are treated as absent
    fn into_patch(self) -> Result<TaskPatch, ValidationError> {
        Ok(TaskPatch {
            title: non_blank(self.title),
            description: self.description,
            deadline: non_blank(self.deadline)
                .map(|d| parse_deadline(&d))
                .transpose()?,
            priority: non_blank(self.priority).map(|p| p.parse()).transpose()?,
            status: non_blank(self.status).map(|s| s.parse()).transpose()?,
            completed: self.completed,
        })
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Serialize)]
pub struct TaskResponse {
    success: bool,
    message: &'static str,
    task: TaskView,
}

#[derive(Serialize)]
pub struct TaskListResponse {
    success: bool,
    statistics: TaskStatistics,
    tasks: Vec<TaskView>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    success: bool,
    message: &'static str,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(body): JsonBody<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let input = body.into_new_task()?;
    let owner = current.owner()?;

    let task = state
        .tasks
        .create_task(&owner, input)
        .await
        .map_err(ApiError::internal("Add task Error"))?;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            success: true,
            message: "task created successfully",
            task: TaskView::from(&task),
        }),
    ))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let owner = current.owner()?;

    let tasks: Vec<TaskView> = state
        .tasks
        .list_tasks(&owner)
        .await
        .map_err(ApiError::internal("Get tasks Error"))?
        .iter()
        .map(TaskView::from)
        .collect();

    let statistics = TaskStatistics::compute(&tasks, Utc::now());

    Ok(Json(TaskListResponse {
        success: true,
        statistics,
        tasks,
    }))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let owner = current.owner()?;

    let task = state
        .tasks
        .get_task(&owner, &id)
        .await
        .map_err(ApiError::internal("Get Task by id Error"))?
        .ok_or_else(not_found)?;

    Ok(Json(TaskResponse {
        success: true,
        message: "task by id fetched successfully",
        task: TaskView::from(&task),
    }))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let patch = body.into_patch()?;
    let owner = current.owner()?;

    let task = state
        .tasks
        .update_task(&owner, &id, patch)
        .await
        .map_err(ApiError::internal("Update Task Error"))?
        .ok_or_else(not_found)?;

    Ok(Json(TaskResponse {
        success: true,
        message: "task updated successfully",
        task: TaskView::from(&task),
    }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let owner = current.owner()?;

    state
        .tasks
        .delete_task(&owner, &id)
        .await
        .map_err(ApiError::internal("Delete Task Error"))?
        .ok_or_else(not_found)?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "task deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasks::{ExternalStatus, Priority};

    fn create(json: &str) -> Result<NewTask, ValidationError> {
        serde_json::from_str::<CreateTaskRequest>(json)
            .unwrap()
            .into_new_task()
    }

    fn patch(json: &str) -> TaskPatch {
        serde_json::from_str::<UpdateTaskRequest>(json)
            .unwrap()
            .into_patch()
            .unwrap()
    }

    #[test]
    fn test_create_requires_fields() {
        for json in [
            r#"{"deadline":"2030-01-01","priority":"high"}"#,
            r#"{"title":"T","priority":"high"}"#,
            r#"{"title":"T","deadline":"2030-01-01"}"#,
            r#"{"title":"  ","deadline":"2030-01-01","priority":"high"}"#,
        ] {
            assert_eq!(create(json).unwrap_err(), ValidationError::MissingField, "{json}");
        }
    }

    #[test]
    fn test_create_parses_values() {
        let task = create(
            r#"{"title":"T","deadline":"2030-01-01T10:00:00Z","priority":"urgent","status":"done","completed":false}"#,
        )
        .unwrap();

        assert_eq!(task.priority, Priority::Urgent);
        assert_eq!(task.status, Some(ExternalStatus::Done));
        assert_eq!(task.completed, Some(false));
    }

    #[test]
    fn test_create_rejects_unknown_values() {
        assert!(matches!(
            create(r#"{"title":"T","deadline":"2030-01-01","priority":"whenever"}"#),
            Err(ValidationError::InvalidPriority(_))
        ));
        assert!(matches!(
            create(r#"{"title":"T","deadline":"2030-01-01","priority":"low","status":"blocked"}"#),
            Err(ValidationError::InvalidStatus(_))
        ));
        assert!(matches!(
            create(r#"{"title":"T","deadline":"soon","priority":"low"}"#),
            Err(ValidationError::InvalidDeadline(_))
        ));
    }

    #[test]
    fn test_description_null_vs_absent() {
        assert_eq!(patch(r#"{}"#).description, None);
        assert_eq!(patch(r#"{"description":null}"#).description, Some(None));
        assert_eq!(
            patch(r#"{"description":"x"}"#).description,
            Some(Some("x".to_string()))
        );
    }

    #[test]
    fn test_empty_strings_are_absent_in_patch() {
        let p = patch(r#"{"title":"","status":"","priority":"","deadline":""}"#);
        assert!(p.title.is_none());
        assert!(p.status.is_none());
        assert!(p.priority.is_none());
        assert!(p.deadline.is_none());
    }
}
