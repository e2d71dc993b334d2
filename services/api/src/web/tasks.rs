//! services/api/src/web/tasks.rs
//!
//! The to-do task scaffold. Unlike the persistence routes these are not
//! session scoped and answer with `{success, result}` envelopes.

use crate::web::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use legal_analyzer_core::{
    domain::{Task, TaskQuery},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

/// A failed task request, rendered as `{"success": false, "error": ...}`.
pub struct TaskError(StatusCode, String);

impl From<PortError> for TaskError {
    fn from(e: PortError) -> Self {
        let status = match &e {
            PortError::NotFound(_) => StatusCode::NOT_FOUND,
            PortError::Conflict(_) => StatusCode::CONFLICT,
            PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => {
                error!("Task request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        TaskError(status, e.to_string())
    }
}

impl From<JsonRejection> for TaskError {
    fn from(rejection: JsonRejection) -> Self {
        TaskError(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "success": false, "error": self.1 })),
        )
            .into_response()
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TaskBody {
    name: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
}

impl From<Task> for TaskBody {
    fn from(t: Task) -> Self {
        Self {
            name: t.name,
            slug: t.slug,
            description: t.description,
            completed: t.completed,
            due_date: t.due_date,
        }
    }
}

impl From<TaskBody> for Task {
    fn from(t: TaskBody) -> Self {
        Self {
            name: t.name,
            slug: t.slug,
            description: t.description,
            completed: t.completed,
            due_date: t.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    #[serde(default)]
    page: u32,
    #[serde(rename = "isCompleted")]
    is_completed: Option<bool>,
}

fn single(task: Task) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "result": { "task": TaskBody::from(task) } }))
}

/// List tasks, twenty per page, newest first.
#[utoipa::path(
    get,
    path = "/tasks",
    params(
        ("page" = Option<u32>, Query, description = "Zero-based page number."),
        ("isCompleted" = Option<bool>, Query, description = "Only tasks with this completion state.")
    ),
    responses((status = 200, description = "A page of tasks"))
)]
pub async fn list_tasks_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ListTasksParams>,
) -> Result<impl IntoResponse, TaskError> {
    let tasks = app_state
        .db
        .list_tasks(TaskQuery {
            page: params.page,
            completed: params.is_completed,
        })
        .await?;
    let tasks: Vec<TaskBody> = tasks.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "success": true, "result": { "tasks": tasks } })))
}

#[utoipa::path(
    post,
    path = "/tasks",
    request_body = TaskBody,
    responses(
        (status = 201, description = "Task created"),
        (status = 409, description = "Slug already taken")
    )
)]
pub async fn create_task_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<TaskBody>, JsonRejection>,
) -> Result<impl IntoResponse, TaskError> {
    let Json(payload) = payload?;
    if payload.slug.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(TaskError(
            StatusCode::BAD_REQUEST,
            "name and slug are required".to_string(),
        ));
    }
    let task = app_state.db.create_task(payload.into()).await?;
    Ok((StatusCode::CREATED, single(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/{slug}",
    params(("slug" = String, Path, description = "Task slug.")),
    responses(
        (status = 200, description = "The task"),
        (status = 404, description = "No such task")
    )
)]
pub async fn get_task_handler(
    State(app_state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let task = app_state.db.get_task(&slug).await?;
    Ok(single(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{slug}",
    params(("slug" = String, Path, description = "Task slug.")),
    responses(
        (status = 200, description = "The deleted task"),
        (status = 404, description = "No such task")
    )
)]
pub async fn delete_task_handler(
    State(app_state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let task = app_state.db.delete_task(&slug).await?;
    Ok(single(task))
}
