use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    cache::{invalidate, read_through},
    error::ApiError,
    events::{emit_project_event, ProjectEvent},
    projects::{
        dto::{CreateProjectRequest, ProjectListResponse, UpdateProjectRequest},
        repo::{self, Project, ProjectStatus},
    },
    state::AppState,
};

pub const PROJECTS_CACHE_KEY: &str = "projects:all";

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<ProjectListResponse>, ApiError> {
    let db = state.db.clone();
    let (projects, source) = read_through(
        state.cache.as_ref(),
        PROJECTS_CACHE_KEY,
        state.cache_ttl(),
        || async move { repo::list_active(&db).await },
    )
    .await?;

    Ok(Json(ProjectListResponse { source, projects }))
}

#[instrument(skip(state, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    identity: AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Project name is required".into()))?;

    let status = payload.status.unwrap_or(ProjectStatus::InProgress);
    let project = repo::create(
        &state.db,
        identity.id,
        name,
        payload.description.as_deref(),
        payload.deadline,
        payload.priority.as_deref(),
        payload.client_name.as_deref(),
        status,
    )
    .await
    .map_err(ApiError::Internal)?;

    invalidate(state.cache.as_ref(), &[PROJECTS_CACHE_KEY]).await;
    emit_project_event(state.events.as_ref(), ProjectEvent::Created, &project).await;

    info!(project_id = %project.id, owner = %identity.id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

#[instrument(skip(state, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    let project = repo::update(
        &state.db,
        id,
        payload.name.as_deref(),
        payload.description.as_deref(),
        payload.deadline,
        payload.priority.as_deref(),
        payload.client_name.as_deref(),
        payload.status,
    )
    .await
    .map_err(ApiError::Internal)?
    .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    invalidate(state.cache.as_ref(), &[PROJECTS_CACHE_KEY]).await;
    emit_project_event(state.events.as_ref(), ProjectEvent::Updated, &project).await;

    info!(project_id = %project.id, "project updated");
    Ok(Json(project))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    let project = repo::soft_delete(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    invalidate(state.cache.as_ref(), &[PROJECTS_CACHE_KEY]).await;
    emit_project_event(state.events.as_ref(), ProjectEvent::Deleted, &project).await;

    info!(project_id = %project.id, "project soft-deleted");
    Ok(Json(project))
}
