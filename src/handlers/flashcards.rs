//! /flashcards

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_session_owned, resolve_page, ApiJson, ApiQuery, IdPath, Message};
use crate::auth::AuthContext;
use crate::db::flashcards::{self, Flashcard, FlashcardReview};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::services;
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

#[derive(Deserialize)]
pub struct GenerateRequest {
  pub topic: String,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct FlashcardBatch {
  pub flashcards: Vec<Flashcard>,
}

#[derive(Deserialize)]
pub struct CreateFlashcard {
  pub question: String,
  pub answer: String,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
  pub flashcard_id: Uuid,
  pub learned: bool,
}

#[derive(Deserialize)]
pub struct FlashcardQuery {
  pub skip: Option<i64>,
  pub limit: Option<i64>,
  pub topic: Option<String>,
}

/// POST /flashcards/generate - generate a deck and save it
pub async fn generate_flashcards(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<FlashcardBatch>> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let topic = req.topic.trim();
  let session_id = req.study_session_id.map(|id| id.to_string());
  {
    let conn = try_lock(&state.db)?;
    ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  }

  let count = state.config.limits.max_flashcards_per_topic;
  let cards = services::flashcards::generate_flashcards(state.model.as_ref(), topic, count).await?;
  let pairs: Vec<(String, String)> = cards.into_iter().map(|c| (c.question, c.answer)).collect();

  let conn = try_lock(&state.db)?;
  let saved = flashcards::create_flashcards(&conn, auth.user_id(), topic, &pairs, session_id.as_deref())?;
  tracing::info!(user_id = %auth.user_id(), count = saved.len(), "Saved generated flashcards");
  Ok(Json(FlashcardBatch { flashcards: saved }))
}

/// POST /flashcards/
pub async fn create_flashcard(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<CreateFlashcard>,
) -> ApiResult<(StatusCode, Json<Flashcard>)> {
  FieldChecks::new()
    .check("question", require_text(&req.question, 500))
    .check("answer", require_text(&req.answer, 1000))
    .finish()?;
  let session_id = req.study_session_id.map(|id| id.to_string());
  let topic = req.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let card = flashcards::create_flashcard(
    &conn,
    auth.user_id(),
    req.question.trim(),
    req.answer.trim(),
    topic,
    session_id.as_deref(),
  )?;
  Ok((StatusCode::CREATED, Json(card)))
}

/// GET /flashcards/
pub async fn list_flashcards(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(query): ApiQuery<FlashcardQuery>,
) -> ApiResult<Json<Vec<Flashcard>>> {
  let (skip, limit) = resolve_page(query.skip, query.limit)?;
  let topic = query.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());
  let conn = try_lock(&state.db)?;
  Ok(Json(flashcards::list_flashcards(&conn, auth.user_id(), topic, skip, limit)?))
}

/// POST /flashcards/review
pub async fn review_flashcard(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<ReviewRequest>,
) -> ApiResult<Json<FlashcardReview>> {
  let conn = try_lock(&state.db)?;
  flashcards::review_flashcard(&conn, auth.user_id(), &req.flashcard_id.to_string(), req.learned)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Flashcard"))
}

/// DELETE /flashcards/{flashcard_id}
pub async fn delete_flashcard(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(flashcard_id): IdPath,
) -> ApiResult<Json<Message>> {
  let conn = try_lock(&state.db)?;
  if !flashcards::delete_flashcard(&conn, auth.user_id(), &flashcard_id)? {
    return Err(ApiError::not_found("Flashcard"));
  }
  Ok(Json(Message::new("Flashcard deleted")))
}
