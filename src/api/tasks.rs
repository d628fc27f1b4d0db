//! Task API endpoints.
//!
//! Provides endpoints for task ingestion:
//! - Create task
//! - List tasks
//! - Get task by id

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::task::Task;

use super::routes::AppState;

/// Create task routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task))
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Raw priority string, validated against the allowed set.
    pub priority: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /tasks - Validate and persist a new task.
async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(_) => {
            return state.error(
                StatusCode::BAD_REQUEST,
                "INVALID_JSON",
                "Request body must be valid JSON",
                None,
            )
        }
    };

    let task = match Task::new(&req.title, &req.description, req.priority.as_deref()) {
        Ok(task) => task,
        Err(e) => {
            return state.error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed",
                Some(json!({ "errors": e.errors })),
            )
        }
    };

    let id = state.store.add(task.clone()).await;
    tracing::info!("Task created: {}", id);

    state.success(
        StatusCode::CREATED,
        json!({
            "message": "Task created successfully",
            "task": task,
        }),
    )
}

/// GET /tasks - List all tasks in insertion order.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Response {
    let tasks = state.store.list().await;
    let count = tasks.len();

    state.success(
        StatusCode::OK,
        json!({
            "tasks": tasks,
            "count": count,
        }),
    )
}

/// GET /tasks/:id - Fetch a single task.
async fn get_task(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(_) => {
            return state.error(
                StatusCode::BAD_REQUEST,
                "INVALID_TASK_ID",
                "Task ID must be a UUID",
                None,
            )
        }
    };

    match state.store.get(id).await {
        Some(task) => state.success(StatusCode::OK, json!({ "task": task })),
        None => state.error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Task not found",
            None,
        ),
    }
}
