use serde::{Deserialize, Serialize};

use crate::auth::repo::{Role, User};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Account payloads never include the password hash (`User` skips it).
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
