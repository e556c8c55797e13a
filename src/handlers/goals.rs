//! /study-goals

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::{resolve_page, ApiJson, ApiQuery, IdPath, Message};
use crate::auth::AuthContext;
use crate::db::goals::{self, GoalChanges, StudyGoal};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{validate_goal_name, validate_topic, FieldChecks, STUDY_TIME_MAX_MINUTES};

#[derive(Deserialize)]
pub struct CreateGoal {
  pub goal_name: String,
  pub topic: String,
  #[serde(default)]
  pub study_time: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateGoal {
  pub goal_name: Option<String>,
  pub topic: Option<String>,
  pub study_time: Option<i64>,
  pub is_completed: Option<bool>,
}

#[derive(Deserialize)]
pub struct GoalQuery {
  pub skip: Option<i64>,
  pub limit: Option<i64>,
  pub completed: Option<bool>,
}

fn check_study_time(minutes: Option<i64>) -> Result<(), String> {
  match minutes {
    Some(m) if m <= 0 => Err("Study time must be a positive number of minutes".to_string()),
    Some(m) if m > STUDY_TIME_MAX_MINUTES => Err(format!(
      "Study time cannot exceed {} minutes",
      STUDY_TIME_MAX_MINUTES
    )),
    _ => Ok(()),
  }
}

/// POST /study-goals/
pub async fn create_goal(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<CreateGoal>,
) -> ApiResult<(StatusCode, Json<StudyGoal>)> {
  FieldChecks::new()
    .check("goal_name", validate_goal_name(&req.goal_name))
    .check("topic", validate_topic(&req.topic))
    .check("study_time", check_study_time(req.study_time))
    .finish()?;

  let conn = try_lock(&state.db)?;
  let goal = goals::create_goal(
    &conn,
    auth.user_id(),
    req.goal_name.trim(),
    req.topic.trim(),
    req.study_time,
  )?;
  Ok((StatusCode::CREATED, Json(goal)))
}

/// GET /study-goals/
pub async fn list_goals(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(query): ApiQuery<GoalQuery>,
) -> ApiResult<Json<Vec<StudyGoal>>> {
  let (skip, limit) = resolve_page(query.skip, query.limit)?;
  let conn = try_lock(&state.db)?;
  Ok(Json(goals::list_goals(&conn, auth.user_id(), query.completed, skip, limit)?))
}

/// GET /study-goals/{goal_id}
pub async fn get_goal(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(goal_id): IdPath,
) -> ApiResult<Json<StudyGoal>> {
  let conn = try_lock(&state.db)?;
  goals::get_goal(&conn, auth.user_id(), &goal_id)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Study goal"))
}

/// PUT /study-goals/{goal_id}
pub async fn update_goal(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(goal_id): IdPath,
  ApiJson(req): ApiJson<UpdateGoal>,
) -> ApiResult<Json<StudyGoal>> {
  let mut checks = FieldChecks::new();
  if let Some(name) = &req.goal_name {
    checks.check("goal_name", validate_goal_name(name));
  }
  if let Some(topic) = &req.topic {
    checks.check("topic", validate_topic(topic));
  }
  checks.check("study_time", check_study_time(req.study_time)).finish()?;

  let changes = GoalChanges {
    goal_name: req.goal_name.map(|n| n.trim().to_string()),
    topic: req.topic.map(|t| t.trim().to_string()),
    study_time: req.study_time,
    is_completed: req.is_completed,
  };

  let conn = try_lock(&state.db)?;
  goals::update_goal(&conn, auth.user_id(), &goal_id, &changes)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Study goal"))
}

/// DELETE /study-goals/{goal_id}
pub async fn delete_goal(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(goal_id): IdPath,
) -> ApiResult<Json<Message>> {
  let conn = try_lock(&state.db)?;
  if !goals::delete_goal(&conn, auth.user_id(), &goal_id)? {
    return Err(ApiError::not_found("Study goal"));
  }
  Ok(Json(Message::new("Study goal deleted")))
}
