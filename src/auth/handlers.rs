use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AccountResponse, MessageResponse, SigninRequest, SignupRequest, TokenResponse,
            UpdateProfileRequest,
        },
        jwt::JwtKeys,
        middleware::AuthUser,
        password::{hash_password, verify_password},
        repo::{Role, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/signin", post(signin))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/update-profile", put(update_profile))
        .route("/users/profile", delete(delete_profile))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let hash = hash_password(&payload.password).map_err(ApiError::Internal)?;
    let role = payload.role.unwrap_or(Role::User);
    let user = User::create(&state.db, &payload.email, &hash, role)
        .await
        .map_err(ApiError::Internal)?;

    info!(user_id = %user.id, email = %user.email, "account created");
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "Account created".into(),
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(mut payload): Json<SigninRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "signin unknown email");
            ApiError::Unauthenticated("Invalid credentials".into())
        })?;

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(ApiError::Internal)?;
    if !ok {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(ApiError::Unauthenticated("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(ApiError::Internal)?;

    info!(user_id = %user.id, "access granted");
    Ok(Json(TokenResponse {
        message: "Access granted".into(),
        token,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    identity: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = User::find_by_id(&state.db, identity.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(AccountResponse {
        message: "success: My profile".into(),
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    identity: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            return Err(ApiError::BadRequest("Invalid email".into()));
        }
    }

    let user = User::update_profile(
        &state.db,
        identity.id,
        payload.name.as_deref(),
        payload.email.as_deref(),
    )
    .await
    .map_err(ApiError::Internal)?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(AccountResponse {
        message: "Profile updated".into(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    identity: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    User::soft_delete(&state.db, identity.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %identity.id, "account deleted");
    Ok(Json(MessageResponse {
        message: "Account deleted".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("user.name@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b"));
    }
}
