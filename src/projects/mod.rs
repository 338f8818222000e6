use axum::{
    routing::{get, patch},
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
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/:id",
            patch(handlers::update_project).delete(handlers::delete_project),
        )
        .route_layer(axum::middleware::from_fn(|req, next| {
            authorize(ALLOWED_ROLES, req, next)
        }))
        .route_layer(axum::middleware::from_fn_with_state(state, authenticate))
}
