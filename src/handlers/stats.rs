//! /stats

use axum::{extract::State, Json};

use crate::auth::AuthContext;
use crate::db::stats::{get_user_stats, Dashboard, UserStats};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /stats/
pub async fn get_stats(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserStats>> {
  let conn = try_lock(&state.db)?;
  get_user_stats(&conn, auth.user_id())?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Stats"))
}

/// GET /stats/dashboard
pub async fn dashboard(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Dashboard>> {
  let conn = try_lock(&state.db)?;
  let stats = get_user_stats(&conn, auth.user_id())?;
  Ok(Json(Dashboard::from_stats(stats.as_ref())))
}
