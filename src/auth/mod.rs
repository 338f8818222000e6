use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repo;

pub use middleware::{authenticate, authorize, AuthUser};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new().merge(handlers::public_routes()).merge(
        handlers::profile_routes()
            .route_layer(axum::middleware::from_fn_with_state(state, authenticate)),
    )
}
