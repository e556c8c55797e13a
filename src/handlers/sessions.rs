//! /study-sessions: completing a study activity awards XP

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::{resolve_page, ApiJson, ApiQuery, IdPath, Message};
use crate::auth::AuthContext;
use crate::db::goals::get_goal;
use crate::db::sessions::{self, NewStudySession, StudySession};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::gamification::StudyMode;
use crate::state::AppState;
use crate::validation::{require_text, validate_session_minutes, FieldChecks};

#[derive(Deserialize)]
pub struct CreateSession {
  #[serde(default)]
  pub study_goal_id: Option<Uuid>,
  pub goal_name: String,
  pub topic: String,
  pub mode: String,
  #[serde(default)]
  pub study_time: Option<i64>,
}

#[derive(Deserialize)]
pub struct SessionQuery {
  pub skip: Option<i64>,
  pub limit: Option<i64>,
  pub mode: Option<String>,
}

/// POST /study-sessions/
pub async fn create_session(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<CreateSession>,
) -> ApiResult<(StatusCode, Json<StudySession>)> {
  let mode = req.mode.parse::<StudyMode>();
  FieldChecks::new()
    .check("goal_name", require_text(&req.goal_name, 100))
    .check("topic", require_text(&req.topic, 500))
    .check("mode", mode.as_ref().map(|_| ()).map_err(Clone::clone))
    .check("study_time", validate_session_minutes(req.study_time))
    .finish()?;
  let mode = mode.map_err(|e| ApiError::validation("mode", e))?;

  let goal_id = req.study_goal_id.map(|id| id.to_string());
  let conn = try_lock(&state.db)?;
  if let Some(goal_id) = &goal_id {
    if get_goal(&conn, auth.user_id(), goal_id)?.is_none() {
      return Err(ApiError::not_found("Study goal"));
    }
  }

  let new_session = NewStudySession {
    study_goal_id: goal_id.as_deref(),
    goal_name: req.goal_name.trim(),
    topic: req.topic.trim(),
    mode: mode.as_str(),
    study_time: req.study_time,
    xp_earned: mode.xp(),
  };
  let today = chrono::Local::now().date_naive();
  let (session, stats) = sessions::record_session(&conn, auth.user_id(), &new_session, today)?;
  tracing::info!(
    user_id = %auth.user_id(),
    mode = %mode,
    xp = session.xp_earned,
    total_xp = stats.total_xp,
    "Recorded study session"
  );

  Ok((StatusCode::CREATED, Json(session)))
}

/// GET /study-sessions/
pub async fn list_sessions(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(query): ApiQuery<SessionQuery>,
) -> ApiResult<Json<Vec<StudySession>>> {
  let (skip, limit) = resolve_page(query.skip, query.limit)?;
  let conn = try_lock(&state.db)?;
  Ok(Json(sessions::list_sessions(
    &conn,
    auth.user_id(),
    query.mode.as_deref(),
    skip,
    limit,
  )?))
}

/// GET /study-sessions/{session_id}
pub async fn get_session(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(session_id): IdPath,
) -> ApiResult<Json<StudySession>> {
  let conn = try_lock(&state.db)?;
  sessions::get_session(&conn, auth.user_id(), &session_id)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Study session"))
}

/// DELETE /study-sessions/{session_id}
pub async fn delete_session(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(session_id): IdPath,
) -> ApiResult<Json<Message>> {
  let conn = try_lock(&state.db)?;
  if !sessions::delete_session(&conn, auth.user_id(), &session_id)? {
    return Err(ApiError::not_found("Study session"));
  }
  Ok(Json(Message::new("Study session deleted")))
}
