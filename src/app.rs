use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, authenticate, authorize, repo::Role};
use crate::state::AppState;
use crate::{projects, tasks};

async fn admin_dashboard() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Admin dashboard" }))
}

fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(admin_dashboard))
        .route_layer(axum::middleware::from_fn(|req, next| {
            authorize(&[Role::Admin], req, next)
        }))
        .route_layer(axum::middleware::from_fn_with_state(state, authenticate))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router(state.clone()))
                .merge(projects::router(state.clone()))
                .merge(tasks::router(state.clone()))
                .merge(admin_router(state.clone()))
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
