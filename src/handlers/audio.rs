//! /audio

use axum::{extract::State, http::StatusCode, Json};
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_session_owned, ApiJson, ApiQuery, PageQuery};
use crate::auth::AuthContext;
use crate::db::audio::{self, AudioGeneration};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::services;
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks};

/// Longest text accepted for narration
const NARRATION_MAX_LEN: usize = 5000;

#[derive(Deserialize)]
pub struct GenerateRequest {
  pub text: String,
}

#[derive(Serialize)]
pub struct GeneratedAudio {
  /// `data:audio/wav;base64,...`
  pub media: String,
}

#[derive(Deserialize)]
pub struct SaveRequest {
  pub text_content: String,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
  /// Base64 audio bytes, optionally as a full data URI
  #[serde(default)]
  pub audio_data: Option<String>,
  #[serde(default)]
  pub duration_seconds: Option<i64>,
}

/// Decode base64 audio, accepting a `data:...;base64,` prefix
fn decode_audio(raw: &str) -> Result<Vec<u8>, String> {
  let payload = match raw.split_once(";base64,") {
    Some((prefix, data)) if prefix.starts_with("data:") => data,
    _ => raw,
  };
  base64::engine::general_purpose::STANDARD
    .decode(payload.trim())
    .map_err(|e| format!("Audio data is not valid base64: {}", e))
}

/// POST /audio/generate
pub async fn generate_audio(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GeneratedAudio>> {
  FieldChecks::new().check("text", require_text(&req.text, NARRATION_MAX_LEN)).finish()?;
  let media = services::audio::narrate(state.model.as_ref(), req.text.trim()).await?;
  Ok(Json(GeneratedAudio { media }))
}

/// POST /audio/save
pub async fn save_audio(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<SaveRequest>,
) -> ApiResult<(StatusCode, Json<AudioGeneration>)> {
  FieldChecks::new()
    .check("text_content", require_text(&req.text_content, NARRATION_MAX_LEN))
    .finish()?;
  let bytes = req
    .audio_data
    .as_deref()
    .map(decode_audio)
    .transpose()
    .map_err(|e| ApiError::validation("audio_data", e))?;
  if matches!(req.duration_seconds, Some(d) if d < 0) {
    return Err(ApiError::validation("duration_seconds", "Duration cannot be negative"));
  }
  let session_id = req.study_session_id.map(|id| id.to_string());

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let saved = audio::save_audio_generation(
    &conn,
    auth.user_id(),
    &req.text_content,
    bytes.as_deref(),
    req.duration_seconds,
    session_id.as_deref(),
  )?;
  Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /audio/history
pub async fn audio_history(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<AudioGeneration>>> {
  let (skip, limit) = page.resolve()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(audio::list_audio_generations(&conn, auth.user_id(), skip, limit)?))
}
