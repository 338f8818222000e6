use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    cache::{invalidate, read_through},
    error::ApiError,
    events::{emit_task_event, TaskEvent},
    projects::repo as projects_repo,
    state::AppState,
    tasks::{
        dto::{CreateTaskRequest, TaskListResponse, UpdateTaskRequest},
        repo::{self, Task, TaskStatus},
    },
};

pub const TASKS_CACHE_KEY: &str = "tasks:all";

pub fn project_tasks_cache_key(project_id: Uuid) -> String {
    format!("tasks:{project_id}")
}

async fn require_project(state: &AppState, project_id: Uuid) -> Result<(), ApiError> {
    projects_repo::find_by_id(&state.db, project_id)
        .await
        .map_err(ApiError::Internal)?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))
}

/// Every task mutation invalidates both the unscoped and the per-project
/// listing.
async fn invalidate_task_caches(state: &AppState, project_id: Uuid) {
    let scoped = project_tasks_cache_key(project_id);
    invalidate(state.cache.as_ref(), &[TASKS_CACHE_KEY, scoped.as_str()]).await;
}

#[instrument(skip(state))]
pub async fn list_tasks_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let key = project_tasks_cache_key(project_id);
    let db = state.db.clone();
    let (tasks, source) = read_through(state.cache.as_ref(), &key, state.cache_ttl(), || {
        async move { repo::list_by_project(&db, project_id).await }
    })
    .await?;

    Ok(Json(TaskListResponse { source, tasks }))
}

#[instrument(skip(state))]
pub async fn list_all_tasks(
    State(state): State<AppState>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let db = state.db.clone();
    let (tasks, source) = read_through(
        state.cache.as_ref(),
        TASKS_CACHE_KEY,
        state.cache_ttl(),
        || async move { repo::list_all(&db).await },
    )
    .await?;

    Ok(Json(TaskListResponse { source, tasks }))
}

#[instrument(skip(state, payload))]
pub async fn create_task(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Task name is required".into()))?;

    require_project(&state, project_id).await?;

    let status = payload.status.unwrap_or(TaskStatus::Pending);
    let task = repo::create(&state.db, project_id, name, status)
        .await
        .map_err(ApiError::Internal)?;

    invalidate_task_caches(&state, project_id).await;
    emit_task_event(state.events.as_ref(), TaskEvent::Created, &task).await;

    info!(task_id = %task.id, project_id = %project_id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, payload))]
pub async fn update_task(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    require_project(&state, project_id).await?;

    let task = repo::update_in_project(
        &state.db,
        task_id,
        project_id,
        payload.name.as_deref(),
        payload.status,
    )
    .await
    .map_err(ApiError::Internal)?
    .ok_or_else(|| ApiError::NotFound("Task not found for the given project".into()))?;

    invalidate_task_caches(&state, project_id).await;
    emit_task_event(state.events.as_ref(), TaskEvent::Updated, &task).await;

    info!(task_id = %task.id, project_id = %project_id, "task updated");
    Ok(Json(task))
}

#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Task>, ApiError> {
    require_project(&state, project_id).await?;

    let task = repo::soft_delete_in_project(&state.db, task_id, project_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Task not found for the given project".into()))?;

    invalidate_task_caches(&state, project_id).await;
    emit_task_event(state.events.as_ref(), TaskEvent::Archived, &task).await;

    info!(task_id = %task.id, project_id = %project_id, "task archived");
    Ok(Json(task))
}
