//! Bearer-token authentication extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use super::db as auth_db;
use super::db::User;
use super::token::hash_token;
use crate::db::try_lock;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated request context.
/// Add this as a handler parameter to require a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// Digest of the presented token (identifies the session for logout)
    pub token_hash: String,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized("Not authenticated".to_string()))?;

        let token_hash = hash_token(bearer.token());

        let user = {
            let conn = try_lock(&state.db)?;
            auth_db::get_session_user(&conn, &token_hash)?
        }
        .ok_or_else(|| ApiError::Unauthorized("Could not validate credentials".to_string()))?;

        if !user.is_active {
            return Err(ApiError::Forbidden("Inactive user".to_string()));
        }

        Ok(AuthContext { user, token_hash })
    }
}
