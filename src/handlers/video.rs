//! /video

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::{ensure_session_owned, ApiJson, ApiQuery, IdPath, PageQuery};
use crate::auth::AuthContext;
use crate::db::try_lock;
use crate::db::videos::{self, EducationalVideo, NewVideo};
use crate::error::{ApiError, ApiResult};
use crate::services::video::{self as video_service, ConnectionReport, GeneratedVideo, DURATIONS};
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

#[derive(Deserialize)]
pub struct GenerateRequest {
  pub topic: String,
  pub duration: String,
}

#[derive(Deserialize)]
pub struct SaveRequest {
  pub topic: String,
  pub duration: String,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
  pub script: String,
  pub title: String,
  #[serde(default)]
  pub key_points: Vec<String>,
  pub video_url: String,
  pub video_id: String,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
  pub estimated_duration: String,
  #[serde(default = "default_status")]
  pub status: String,
}

fn default_status() -> String {
  "done".to_string()
}

fn check_duration(duration: &str) -> Result<(), String> {
  if DURATIONS.contains(&duration) {
    Ok(())
  } else {
    Err("Duration must be one of: short, medium, long".to_string())
  }
}

/// POST /video/generate - script, render and wait for the finished video
pub async fn generate_video(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GeneratedVideo>> {
  FieldChecks::new()
    .check("topic", require_text(&req.topic, TOPIC_MAX_LEN))
    .check("duration", check_duration(&req.duration))
    .finish()?;

  let video = video_service::generate_video(
    state.model.as_ref(),
    state.video.as_ref(),
    &state.config.video,
    req.topic.trim(),
    &req.duration,
  )
  .await?;
  Ok(Json(video))
}

/// POST /video/save
pub async fn save_video(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<SaveRequest>,
) -> ApiResult<(StatusCode, Json<EducationalVideo>)> {
  FieldChecks::new()
    .check("topic", require_text(&req.topic, TOPIC_MAX_LEN))
    .check("duration", check_duration(&req.duration))
    .check("video_url", require_text(&req.video_url, 2000))
    .check("video_id", require_text(&req.video_id, 200))
    .finish()?;
  let session_id = req.study_session_id.map(|id| id.to_string());

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let saved = videos::save_video(
    &conn,
    auth.user_id(),
    &NewVideo {
      study_session_id: session_id.as_deref(),
      topic: req.topic.trim(),
      duration: &req.duration,
      script: &req.script,
      title: &req.title,
      key_points: &req.key_points,
      video_url: &req.video_url,
      video_id: &req.video_id,
      thumbnail_url: req.thumbnail_url.as_deref(),
      estimated_duration: &req.estimated_duration,
      status: &req.status,
    },
  )?;
  Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /video/
pub async fn list_videos(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<EducationalVideo>>> {
  let (skip, limit) = page.resolve()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(videos::list_videos(&conn, auth.user_id(), skip, limit)?))
}

/// GET /video/test-connection
pub async fn test_connection(State(state): State<AppState>, _auth: AuthContext) -> Json<ConnectionReport> {
  Json(video_service::test_connection(state.video.as_ref()).await)
}

/// GET /video/{video_id}
pub async fn get_video(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(video_id): IdPath,
) -> ApiResult<Json<EducationalVideo>> {
  let conn = try_lock(&state.db)?;
  videos::get_video(&conn, auth.user_id(), &video_id)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Video"))
}
