//! Account endpoints: register, login, logout and token introspection.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::db as auth_db;
use super::db::User;
use super::middleware::AuthContext;
use super::password;
use super::token::{generate_token, hash_token};
use crate::config;
use crate::db::{try_lock, LogOnError};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{ApiJson, Message};
use crate::state::AppState;
use crate::validation::{validate_email, validate_password, FieldChecks};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: String,
}

/// Issue a token for `user` and store its digest
fn issue_token(conn: &rusqlite::Connection, user: User, expiry_minutes: i64) -> ApiResult<TokenResponse> {
    let token = generate_token();
    auth_db::create_session(conn, &user.id, &hash_token(&token), expiry_minutes)?;
    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer",
        user,
    })
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    FieldChecks::new()
        .check("email", validate_email(&req.email))
        .check("password", validate_password(&req.password))
        .finish()?;
    let email = req.email.trim().to_lowercase();
    let full_name = req.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    // Hash before taking the lock; argon2 is slow on purpose
    let password_hash = password::hash_password(&req.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?;

    let conn = try_lock(&state.db)?;
    if auth_db::email_exists(&conn, &email)? {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }
    let user = auth_db::create_user(&conn, &email, &password_hash, full_name)?;
    tracing::info!(user_id = %user.id, "Registered new user");

    let token = issue_token(&conn, user, state.config.auth.token_expiry_minutes)?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email.trim().to_lowercase();
    let conn = try_lock(&state.db)?;

    let invalid = || ApiError::Unauthorized("Incorrect email or password".to_string());
    let (user, stored_hash) = auth_db::get_user_by_email(&conn, &email)?.ok_or_else(invalid)?;
    if !password::verify_password(&req.password, &stored_hash) {
        tracing::info!(user_id = %user.id, "Rejected login with wrong password");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("Inactive user".to_string()));
    }

    auth_db::update_last_login(&conn, &user.id).log_warn("Failed to update last login");

    // Clean up expired tokens occasionally (~10% chance)
    if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
        if let Some(removed) = auth_db::cleanup_expired_sessions(&conn).log_warn("Token cleanup failed") {
            tracing::debug!(removed, "Removed expired tokens");
        }
    }

    let user = auth_db::get_user_by_id(&conn, &user.id)?.unwrap_or(user);
    Ok(Json(issue_token(&conn, user, state.config.auth.token_expiry_minutes)?))
}

/// GET /auth/me
pub async fn me(auth: AuthContext) -> Json<User> {
    Json(auth.user)
}

/// GET /auth/verify-token
pub async fn verify_token(auth: AuthContext) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user_id: auth.user.id,
        email: auth.user.email,
    })
}

/// POST /auth/logout - revoke the presented token
pub async fn logout(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Message>> {
    let conn = try_lock(&state.db)?;
    auth_db::delete_session(&conn, &auth.token_hash)?;
    Ok(Json(Message::new("Logged out")))
}
