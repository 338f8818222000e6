use axum::{
    routing::{get, put},
    Router,
};

use crate::auth::{authenticate, authorize, repo::Role};
use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;

const ALLOWED_ROLES: &[Role] = &[Role::User, Role::Admin];

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/projects/:project_id/tasks",
            get(handlers::list_tasks_by_project).post(handlers::create_task),
        )
        .route(
            "/projects/:project_id/tasks/:task_id",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .route("/tasks", get(handlers::list_all_tasks))
        .route_layer(axum::middleware::from_fn(|req, next| {
            authorize(ALLOWED_ROLES, req, next)
        }))
        .route_layer(axum::middleware::from_fn_with_state(state, authenticate))
}
