//! /ai: motivational copy and Pomodoro research recommendations

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::services::aida::{self, AidaContent};
use crate::services::pomodoro::{self, Recommendation};
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

#[derive(Deserialize)]
pub struct TopicRequest {
  pub topic: String,
}

#[derive(Serialize)]
pub struct PomodoroRecommendations {
  pub recommendations: Vec<Recommendation>,
}

/// POST /ai/aida-engagement
pub async fn aida_engagement(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<TopicRequest>,
) -> ApiResult<Json<AidaContent>> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let content = aida::generate_engagement(state.model.as_ref(), req.topic.trim()).await?;
  Ok(Json(content))
}

/// POST /ai/pomodoro-recommendations
pub async fn pomodoro_recommendations(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<TopicRequest>,
) -> ApiResult<Json<PomodoroRecommendations>> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let recommendations = pomodoro::generate_recommendations(state.model.as_ref(), req.topic.trim()).await?;
  Ok(Json(PomodoroRecommendations { recommendations }))
}
