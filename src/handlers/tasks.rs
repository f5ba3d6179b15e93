// Financials API - Task handlers
// Tasks are the only record kind that can be updated in place.

use axum::extract::{Path, State};
use axum::response::Json;
use tracing::{info, instrument, warn};

use super::{storage_failure, AppState, Deleted};
use crate::db::Filter;
use crate::error::{ApiError, JsonBody};
use crate::models::{Record, Task};

/// GET /tasks/:person - Tasks of one person, newest first
#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(person): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    info!("Fetching tasks for person");

    let tasks = state
        .tasks
        .list(Filter::eq("person", person.as_str()))
        .await
        .map_err(storage_failure("Failed to fetch tasks"))?;

    info!(count = tasks.len(), "Found tasks");
    Ok(Json(tasks))
}

/// POST /tasks - Store the body as a new task
#[instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Task>, ApiError> {
    info!(?body, "Creating task");

    let task = state
        .tasks
        .create(body)
        .await
        .map_err(storage_failure("Failed to create task"))?;

    info!(id = task.id(), "Task created");
    Ok(Json(task))
}

/// PUT /tasks/:id - Overwrite the fields named in the body, nulls included
#[instrument(skip(state, body))]
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<Task>, ApiError> {
    info!(?body, "Updating task");

    let updated = state
        .tasks
        .update(id, body)
        .await
        .map_err(storage_failure("Failed to update task"))?;

    match updated {
        Some(task) => {
            info!("Task updated");
            Ok(Json(task))
        }
        None => {
            warn!("Task not found");
            Err(ApiError::NotFound(Task::LABEL))
        }
    }
}

/// DELETE /tasks/:id
#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    info!("Deleting task");

    let deleted = state
        .tasks
        .delete(id)
        .await
        .map_err(storage_failure("Failed to delete task"))?;

    match deleted {
        Some(_) => {
            info!("Task deleted");
            Ok(Json(Deleted::new()))
        }
        None => {
            warn!("Task not found");
            Err(ApiError::NotFound(Task::LABEL))
        }
    }
}
