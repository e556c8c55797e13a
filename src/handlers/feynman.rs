//! /feynman

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_session_owned, ApiJson, ApiQuery, PageQuery};
use crate::auth::AuthContext;
use crate::db::feynman::{self as feynman_db, FeynmanSession, NewFeynmanSession};
use crate::db::try_lock;
use crate::error::ApiResult;
use crate::services::feynman::{self, FeynmanFeedback};
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

/// Longest learner explanation accepted for analysis
const EXPLANATION_MAX_LEN: usize = 5000;

#[derive(Deserialize)]
pub struct ExplanationRequest {
  pub topic: String,
}

#[derive(Serialize)]
pub struct ExplanationResponse {
  pub explanation: String,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
  pub topic: String,
  pub user_explanation: String,
}

#[derive(Deserialize)]
pub struct SaveRequest {
  pub topic: String,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
  pub ai_explanation: String,
  #[serde(default)]
  pub user_explanation: Option<String>,
  #[serde(default)]
  pub feedback_gaps: Option<String>,
  #[serde(default)]
  pub feedback_simplifications: Option<String>,
}

/// POST /feynman/explanation
pub async fn explanation(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<ExplanationRequest>,
) -> ApiResult<Json<ExplanationResponse>> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let explanation = feynman::explain(state.model.as_ref(), req.topic.trim()).await?;
  Ok(Json(ExplanationResponse { explanation }))
}

/// POST /feynman/analyze
pub async fn analyze(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<AnalyzeRequest>,
) -> ApiResult<Json<FeynmanFeedback>> {
  FieldChecks::new()
    .check("topic", require_text(&req.topic, TOPIC_MAX_LEN))
    .check("user_explanation", require_text(&req.user_explanation, EXPLANATION_MAX_LEN))
    .finish()?;
  let feedback = feynman::analyze(
    state.model.as_ref(),
    req.topic.trim(),
    req.user_explanation.trim(),
  )
  .await?;
  Ok(Json(feedback))
}

/// POST /feynman/sessions
pub async fn save_session(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<SaveRequest>,
) -> ApiResult<(StatusCode, Json<FeynmanSession>)> {
  FieldChecks::new()
    .check("topic", require_text(&req.topic, TOPIC_MAX_LEN))
    .check("ai_explanation", require_text(&req.ai_explanation, EXPLANATION_MAX_LEN))
    .finish()?;
  let session_id = req.study_session_id.map(|id| id.to_string());

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let saved = feynman_db::save_feynman_session(
    &conn,
    auth.user_id(),
    &NewFeynmanSession {
      study_session_id: session_id.as_deref(),
      topic: req.topic.trim(),
      ai_explanation: &req.ai_explanation,
      user_explanation: req.user_explanation.as_deref(),
      feedback_gaps: req.feedback_gaps.as_deref(),
      feedback_simplifications: req.feedback_simplifications.as_deref(),
    },
  )?;
  Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /feynman/sessions
pub async fn list_sessions(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<FeynmanSession>>> {
  let (skip, limit) = page.resolve()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(feynman_db::list_feynman_sessions(&conn, auth.user_id(), skip, limit)?))
}
