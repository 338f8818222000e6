use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo::Role, repo::User},
    error::ApiError,
    state::AppState,
};

use axum::extract::FromRef;

/// Request-scoped identity, attached by `authenticate` and read by
/// `authorize` and handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// Verifies the bearer token and resolves its subject to an account. The
/// resolved `{id, role}` pair goes into request extensions for downstream
/// middleware and handlers.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized: No token provided".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthenticated("Unauthorized: No token provided".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        ApiError::Unauthenticated("Invalid or expired token".into())
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(req).await)
}

/// Role gate. Policy is supplied per route; the guard itself is
/// role-agnostic. Must run after `authenticate`.
pub async fn authorize(
    allowed: &'static [Role],
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match req.extensions().get::<AuthUser>() {
        Some(user) if allowed.contains(&user.role) => Ok(next.run(req).await),
        Some(user) => {
            warn!(user_id = %user.id, role = ?user.role, "insufficient role");
            Err(ApiError::Forbidden("Forbidden: Insufficient role".into()))
        }
        None => Err(ApiError::Forbidden("Forbidden: Insufficient role".into())),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("Unauthorized: No token provided".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn authenticated_app() -> Router {
        let state = AppState::fake();
        Router::new()
            .route("/guarded", get(ok_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    fn role_gated_app(allowed: &'static [Role]) -> Router {
        Router::new()
            .route("/gated", get(ok_handler))
            .route_layer(middleware::from_fn(move |req, next| {
                authorize(allowed, req, next)
            }))
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let res = authenticated_app()
            .oneshot(HttpRequest::get("/guarded").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Unauthorized: No token provided");
    }

    #[tokio::test]
    async fn non_bearer_header_is_unauthenticated() {
        let res = authenticated_app()
            .oneshot(
                HttpRequest::get("/guarded")
                    .header("Authorization", "Basic abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let res = authenticated_app()
            .oneshot(
                HttpRequest::get("/guarded")
                    .header("Authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn allowed_role_passes_the_gate() {
        let identity = AuthUser {
            id: Uuid::new_v4(),
            role: Role::User,
        };
        let res = role_gated_app(&[Role::User, Role::Admin])
            .oneshot(
                HttpRequest::get("/gated")
                    .extension(identity)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn disallowed_role_is_forbidden() {
        let identity = AuthUser {
            id: Uuid::new_v4(),
            role: Role::User,
        };
        let res = role_gated_app(&[Role::Admin])
            .oneshot(
                HttpRequest::get("/gated")
                    .extension(identity)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Forbidden: Insufficient role");
    }

    #[tokio::test]
    async fn missing_identity_is_forbidden() {
        let res = role_gated_app(&[Role::User])
            .oneshot(HttpRequest::get("/gated").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
